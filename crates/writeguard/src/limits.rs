//! Size limit constants for input validation

/// Maximum length for a token string (64KB)
pub(crate) const MAX_TOKEN_LENGTH: usize = 64 * 1024;

// ============================================================================
// Decoded token segment limits
// ============================================================================

/// Maximum size for decoded token header JSON (8KB)
pub(crate) const MAX_DECODED_HEADER_SIZE: usize = 8 * 1024;

/// Maximum size for decoded token payload JSON (64KB)
pub(crate) const MAX_DECODED_PAYLOAD_SIZE: usize = 64 * 1024;

/// Maximum size for decoded signature bytes (1KB)
/// RSA signatures are 256-512 bytes for the key sizes in use
pub(crate) const MAX_DECODED_SIGNATURE_SIZE: usize = 1024;

// ============================================================================
// Header and claim limits
// ============================================================================

/// Maximum length for the key ID (kid) header field (256 bytes)
pub(crate) const MAX_KID_LENGTH: usize = 256;

/// Maximum length for the subject claim (128 bytes, provider-defined uid limit)
pub(crate) const MAX_SUBJECT_LENGTH: usize = 128;

/// Maximum length for other claim string values (2048 bytes)
pub(crate) const MAX_CLAIM_STRING_LENGTH: usize = 2048;

/// Minimum valid Unix timestamp (1970-01-01 00:00:00 UTC)
pub(crate) const MIN_TIMESTAMP: i64 = 0;

/// Maximum valid Unix timestamp (2100-01-01 00:00:00 UTC)
pub(crate) const MAX_TIMESTAMP: i64 = 4_102_444_800;

// ============================================================================
// Key source limits
// ============================================================================

/// Maximum size for the certificate map response (512KB)
pub(crate) const MAX_CERTIFICATE_RESPONSE_SIZE: usize = 512 * 1024;

/// Maximum number of certificates in one response
pub(crate) const MAX_CERTIFICATE_COUNT: usize = 100;

/// Maximum size of a single PEM certificate (16KB)
pub(crate) const MAX_CERTIFICATE_PEM_SIZE: usize = 16 * 1024;

/// Upper bound applied to an advertised `max-age` (1 day)
pub(crate) const MAX_CERTIFICATE_LIFETIME: u64 = 86_400;
