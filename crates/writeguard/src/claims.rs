//! Claims validation for identity tokens
//!
//! A token's payload is decoded into [`RawClaims`], where every field is
//! optional, and only becomes [`TokenClaims`] after every check passes.

use crate::error::{Error, Result};
use crate::limits::{
    MAX_CLAIM_STRING_LENGTH, MAX_DECODED_PAYLOAD_SIZE, MAX_SUBJECT_LENGTH, MAX_TIMESTAMP,
    MIN_TIMESTAMP,
};
use crate::utils::base64url;
use miniserde::Deserialize;

/// Payload as it appears on the wire
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawClaims {
    #[serde(rename = "iss")]
    issuer: Option<String>,
    #[serde(rename = "aud")]
    audience: Option<String>,
    #[serde(rename = "sub")]
    subject: Option<String>,
    #[serde(rename = "iat")]
    issued_at: Option<i64>,
    #[serde(rename = "exp")]
    expires_at: Option<i64>,
    auth_time: Option<i64>,
    email: Option<String>,
    /// Must be a JSON boolean; `"true"` or `1` fail to decode
    email_verified: Option<bool>,
}

/// Identity asserted by a fully verified token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    pub issuer: String,
    pub audience: String,
    pub subject: String,
    pub issued_at: i64,
    pub expires_at: i64,
    pub auth_time: i64,
    /// Absent for sign-in methods without an email address
    pub email: Option<String>,
    pub email_verified: bool,
}

/// What a token must have been issued for
#[derive(Debug, Clone)]
pub(crate) struct Expectations<'a> {
    pub issuer: &'a str,
    pub audience: &'a str,
    pub now: i64,
}

impl RawClaims {
    /// Decode the base64url payload segment
    pub(crate) fn decode(segment: &str) -> Result<Self> {
        let json = base64url::decode_string(segment, MAX_DECODED_PAYLOAD_SIZE)?;

        miniserde::json::from_str(&json)
            .map_err(|e| Error::FormatInvalidJson(format!("Failed to parse payload: {e}")))
    }

    /// Check every claim, in order, and stop at the first failure
    pub(crate) fn validate(self, expected: &Expectations<'_>) -> Result<TokenClaims> {
        let now = expected.now;

        let expires_at = timestamp("exp", self.expires_at)?;
        if expires_at <= now {
            return Err(Error::TokenExpired {
                expired_at: expires_at,
                now,
            });
        }

        let issued_at = timestamp("iat", self.issued_at)?;
        not_in_future("iat", issued_at, now)?;

        let auth_time = timestamp("auth_time", self.auth_time)?;
        not_in_future("auth_time", auth_time, now)?;

        let issuer = bounded("iss", self.issuer, MAX_CLAIM_STRING_LENGTH)?;
        if issuer != expected.issuer {
            return Err(Error::TokenIssuerMismatch);
        }

        let audience = bounded("aud", self.audience, MAX_CLAIM_STRING_LENGTH)?;
        if audience != expected.audience {
            return Err(Error::TokenAudienceMismatch);
        }

        let subject = bounded("sub", self.subject, MAX_SUBJECT_LENGTH)?;
        if subject.is_empty() {
            return Err(Error::TokenSubjectEmpty);
        }

        if self.email_verified != Some(true) {
            return Err(Error::TokenEmailUnverified);
        }

        if let Some(email) = &self.email {
            check_length("email", email, MAX_CLAIM_STRING_LENGTH)?;
        }

        Ok(TokenClaims {
            issuer,
            audience,
            subject,
            issued_at,
            expires_at,
            auth_time,
            email: self.email,
            email_verified: true,
        })
    }
}

fn timestamp(claim: &str, value: Option<i64>) -> Result<i64> {
    let value = value.ok_or_else(|| Error::TokenMissingClaim(claim.into()))?;
    if !(MIN_TIMESTAMP..=MAX_TIMESTAMP).contains(&value) {
        return Err(Error::TimestampOutOfBounds {
            value,
            min: MIN_TIMESTAMP,
            max: MAX_TIMESTAMP,
        });
    }
    Ok(value)
}

fn not_in_future(claim: &str, value: i64, now: i64) -> Result<()> {
    if value > now {
        return Err(Error::TokenFromFuture {
            claim: claim.into(),
            value,
            now,
        });
    }
    Ok(())
}

fn bounded(claim: &str, value: Option<String>, max: usize) -> Result<String> {
    let value = value.ok_or_else(|| Error::TokenMissingClaim(claim.into()))?;
    check_length(claim, &value, max)?;
    Ok(value)
}

fn check_length(claim: &str, value: &str, max: usize) -> Result<()> {
    if value.len() > max {
        return Err(Error::ClaimStringTooLong {
            claim: claim.into(),
            length: value.len(),
            max,
        });
    }
    Ok(())
}
