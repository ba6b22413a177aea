//! Signature algorithm accepted for identity tokens
use crate::error::{Error, Result};
use crate::limits::MAX_DECODED_SIGNATURE_SIZE;
use crate::utils::base64url;

use aws_lc_rs::signature::{self, UnparsedPublicKey};

/// Algorithm identifier from the token header
///
/// The identity provider signs with RS256 only. Anything else, including
/// `none`, is refused before a key is ever looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    RS256,
}

impl Algorithm {
    pub(crate) fn from_header(alg: Option<&str>) -> Result<Self> {
        match alg {
            Some("RS256") => Ok(Algorithm::RS256),
            _ => Err(Error::AlgorithmNotAllowed),
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Algorithm::RS256 => "RS256",
        }
    }

    fn verification_algorithm(&self) -> &'static dyn signature::VerificationAlgorithm {
        match self {
            Algorithm::RS256 => &signature::RSA_PKCS1_2048_8192_SHA256,
        }
    }

    /// Verify a signature using the algorithm
    ///
    /// # Arguments
    /// * `signing_input` - The data that was signed (header.payload)
    /// * `signature` - The Base64URL-encoded signature
    /// * `spki` - The DER-encoded SubjectPublicKeyInfo from the signing certificate
    pub(crate) fn verify_signature(
        &self,
        signing_input: &str,
        signature: &str,
        spki: &[u8],
    ) -> Result<()> {
        let signature_bytes = base64url::decode_bytes(signature, MAX_DECODED_SIGNATURE_SIZE)?;
        let public_key = UnparsedPublicKey::new(self.verification_algorithm(), spki);

        public_key
            .verify(signing_input.as_bytes(), &signature_bytes)
            .map_err(|_| Error::SignatureInvalid)
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
