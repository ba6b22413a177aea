use crate::certs::caching::RemoteKeyCache;
use crate::claims::{Expectations, RawClaims, TokenClaims};
use crate::error::{Error, Rejection, Result};
use crate::header::TokenHeader;
use crate::limits::MAX_TOKEN_LENGTH;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Identity token verifier
///
/// Configured once per deployment with the expected issuer and audience, and
/// reused for every request. Clones share the same key cache.
#[derive(Clone)]
pub struct TokenVerifier {
    issuer: String,
    audience: String,
    keys: Arc<RemoteKeyCache>,
}

impl TokenVerifier {
    pub fn new(
        issuer: impl Into<String>,
        audience: impl Into<String>,
        keys: Arc<RemoteKeyCache>,
    ) -> Self {
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
            keys,
        }
    }

    /// Verify a token against the system clock
    pub async fn verify(&self, token: &str) -> std::result::Result<TokenClaims, Rejection> {
        self.verify_at(token, current_timestamp()).await
    }

    /// Verify a token as of Unix time `now`
    ///
    /// The reason for a failure is logged at `debug` level and never returned.
    pub async fn verify_at(
        &self,
        token: &str,
        now: i64,
    ) -> std::result::Result<TokenClaims, Rejection> {
        self.verify_detailed(token, now).await.map_err(|error| {
            let rejection = Rejection::from(&error);
            tracing::debug!(%error, %rejection, "token rejected");
            rejection
        })
    }

    async fn verify_detailed(&self, token: &str, now: i64) -> Result<TokenClaims> {
        // 1. Structure
        if token.len() > MAX_TOKEN_LENGTH {
            return Err(Error::TokenTooLarge {
                size: token.len(),
                max: MAX_TOKEN_LENGTH,
            });
        }

        let mut parts = token.split('.');
        let (Some(header_b64), Some(payload_b64), Some(signature_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(Error::FormatInvalid);
        };
        if header_b64.is_empty() || payload_b64.is_empty() || signature_b64.is_empty() {
            return Err(Error::FormatInvalid);
        }

        // 2. Header
        let header = TokenHeader::decode(header_b64)?;

        // 3. Claims
        let claims = RawClaims::decode(payload_b64)?.validate(&Expectations {
            issuer: &self.issuer,
            audience: &self.audience,
            now,
        })?;

        // 4. Key lookup
        let keys = self.keys.key_set(now).await?;
        let spki = keys.get(&header.key_id).ok_or(Error::KeyNotFound)?;

        // 5. Signature
        let signing_input = &token[..header_b64.len() + 1 + payload_b64.len()];
        header
            .algorithm
            .verify_signature(signing_input, signature_b64, spki)?;

        Ok(claims)
    }
}

/// Get current Unix timestamp
pub(crate) fn current_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| std::time::Duration::from_secs(0))
        .as_secs() as i64
}
