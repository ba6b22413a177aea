use crate::algorithm::Algorithm;
use crate::error::{Error, Result};
use crate::limits::{MAX_DECODED_HEADER_SIZE, MAX_KID_LENGTH};
use crate::utils::base64url;
use miniserde::Deserialize;

/// Token header as it appears on the wire
#[derive(Debug, Clone, Deserialize)]
struct RawHeader {
    #[serde(rename = "alg")]
    algorithm: Option<String>,

    #[serde(rename = "kid")]
    key_id: Option<String>,
}

/// Validated token header
///
/// Only exists once `alg` is RS256 and `kid` is a bounded, non-empty string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TokenHeader {
    pub algorithm: Algorithm,
    pub key_id: String,
}

impl TokenHeader {
    /// Decode and validate the base64url header segment
    pub(crate) fn decode(segment: &str) -> Result<Self> {
        let json = base64url::decode_string(segment, MAX_DECODED_HEADER_SIZE)?;

        let raw: RawHeader = miniserde::json::from_str(&json)
            .map_err(|e| Error::FormatInvalidJson(format!("Failed to parse header: {e}")))?;

        let algorithm = Algorithm::from_header(raw.algorithm.as_deref())?;

        let key_id = raw.key_id.ok_or(Error::KeyIdMissing)?;
        if key_id.is_empty() {
            return Err(Error::KeyIdMissing);
        }
        if key_id.len() > MAX_KID_LENGTH {
            return Err(Error::HeaderFieldTooLong {
                field: "kid".into(),
                length: key_id.len(),
                max: MAX_KID_LENGTH,
            });
        }

        Ok(Self { algorithm, key_id })
    }
}
