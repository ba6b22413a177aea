//! Errors for writeguard

use thiserror::Error;

/// Internal writeguard errors
///
/// These carry the precise failure reason for structured logs. They are never
/// handed to HTTP callers; see [`Rejection`] for the outward shape.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Invalid configuration: {0}")]
    ConfigurationInvalid(String),

    // ============================================================================
    // Key Source Errors
    // ============================================================================
    #[error("Key source unavailable: {0}")]
    KeySourceUnavailable(String),

    #[error("Key source response too large: {size} bytes (maximum: {max} bytes)")]
    KeySourceResponseTooLarge { size: usize, max: usize },

    #[error("Key source returned too many certificates: {count} (maximum: {max})")]
    KeySourceTooManyCertificates { count: usize, max: usize },

    // ============================================================================
    // Certificate Errors
    // ============================================================================
    #[error("Certificate parse failed: {0}")]
    CertificateParse(String),

    #[error("Certificate too large: {size} bytes (maximum: {max} bytes)")]
    CertificateTooLarge { size: usize, max: usize },

    // ============================================================================
    // Format Errors
    // ============================================================================
    #[error("Token too large: {size} bytes (maximum: {max} bytes)")]
    TokenTooLarge { size: usize, max: usize },

    #[error("Invalid token format: expected three non-empty parts separated by '.'")]
    FormatInvalid,

    #[error("Base64URL decoding failed: {0}")]
    FormatInvalidBase64(String),

    #[error("JSON parsing failed: {0}")]
    FormatInvalidJson(String),

    // ============================================================================
    // Header Errors
    // ============================================================================
    #[error("Algorithm not allowed (only RS256 is accepted)")]
    AlgorithmNotAllowed,

    #[error("Token header has no usable key id")]
    KeyIdMissing,

    #[error("Header field '{field}' too long: {length} bytes (maximum: {max} bytes)")]
    HeaderFieldTooLong {
        field: String,
        length: usize,
        max: usize,
    },

    // ============================================================================
    // Claim Errors
    // ============================================================================
    #[error("Required token claim '{0}' is missing")]
    TokenMissingClaim(String),

    #[error("Token expired at {expired_at} (now: {now})")]
    TokenExpired { expired_at: i64, now: i64 },

    #[error("Token claim '{claim}' lies in the future ({value}, now: {now})")]
    TokenFromFuture { claim: String, value: i64, now: i64 },

    #[error("Token issuer does not match the deployment")]
    TokenIssuerMismatch,

    #[error("Token audience does not match the deployment")]
    TokenAudienceMismatch,

    #[error("Token subject is empty")]
    TokenSubjectEmpty,

    #[error("Token email is not verified")]
    TokenEmailUnverified,

    #[error("Claim '{claim}' too long: {length} bytes (maximum: {max} bytes)")]
    ClaimStringTooLong {
        claim: String,
        length: usize,
        max: usize,
    },

    #[error("Timestamp out of bounds: {value} (valid range: {min} to {max})")]
    TimestampOutOfBounds { value: i64, min: i64, max: i64 },

    // ============================================================================
    // Signature Errors
    // ============================================================================
    #[error("No signing key matches the token key id")]
    KeyNotFound,

    #[error("Signature verification failed")]
    SignatureInvalid,

    // ============================================================================
    // Shared Cache Errors
    // ============================================================================
    #[error("Shared cache error: {0}")]
    SharedCache(String),
}

impl Error {
    /// Whether the failure means "could not verify" rather than "verified as bad"
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Error::ConfigurationInvalid(_)
                | Error::KeySourceUnavailable(_)
                | Error::KeySourceResponseTooLarge { .. }
                | Error::KeySourceTooManyCertificates { .. }
                | Error::SharedCache(_)
        )
    }
}

/// Result type alias for writeguard operations
pub type Result<T> = std::result::Result<T, Error>;

/// Opaque outcome of a failed token verification
///
/// Every token problem collapses into [`Rejection::Invalid`]; problems reaching
/// the identity provider or the shared cache collapse into
/// [`Rejection::Unavailable`]. Neither variant says which check failed.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    #[error("invalid token")]
    Invalid,

    #[error("token verification unavailable")]
    Unavailable,
}

impl From<&Error> for Rejection {
    fn from(error: &Error) -> Self {
        if error.is_unavailable() {
            Rejection::Unavailable
        } else {
            Rejection::Invalid
        }
    }
}
