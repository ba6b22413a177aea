//! Signing certificates published by the identity provider
pub mod caching;

use crate::cert::extract_spki;
use crate::error::{Error, Result};
use crate::limits::{
    MAX_CERTIFICATE_COUNT, MAX_CERTIFICATE_LIFETIME, MAX_CERTIFICATE_RESPONSE_SIZE,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

/// Lifetime assumed when the provider does not advertise `max-age`
pub const DEFAULT_MAX_AGE: u64 = 3600;

/// Floor for the shared-tier TTL
pub const MIN_SHARED_TTL: u64 = 60;

/// Raw certificate map as published: key id to PEM certificate
pub type CertificateMap = BTreeMap<String, String>;

/// Public keys usable for signature verification, by key id
///
/// A set is built in one piece from a full certificate map and never
/// modified afterwards.
#[derive(Debug, Clone)]
pub struct SigningKeySet {
    keys: HashMap<String, Arc<[u8]>>,
    expires_at: i64,
}

impl SigningKeySet {
    /// Import every certificate in `certificates`
    ///
    /// Certificates that cannot be parsed are logged and skipped; they never
    /// abort the rest of the batch.
    pub(crate) fn import(certificates: &CertificateMap, expires_at: i64) -> Self {
        let mut keys = HashMap::with_capacity(certificates.len());

        for (kid, pem) in certificates {
            match extract_spki(pem) {
                Ok(spki) => {
                    keys.insert(kid.clone(), Arc::from(spki));
                }
                Err(error) => {
                    tracing::warn!(kid = %kid, %error, "skipping unparseable signing certificate");
                }
            }
        }

        Self { keys, expires_at }
    }

    /// DER SubjectPublicKeyInfo for `kid`
    pub fn get(&self, kid: &str) -> Option<&[u8]> {
        self.keys.get(kid).map(AsRef::as_ref)
    }

    /// Unix time after which the set must be refreshed
    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }

    pub fn is_fresh(&self, now: i64) -> bool {
        now < self.expires_at
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// A successful response from the certificate endpoint
#[derive(Debug, Clone)]
pub(crate) struct FetchedCertificates {
    pub certificates: CertificateMap,
    /// Lifetime advertised via `Cache-Control`, or [`DEFAULT_MAX_AGE`]
    pub max_age: u64,
}

fn source_error(details: impl std::fmt::Display) -> Error {
    Error::KeySourceUnavailable(details.to_string())
}

/// Fetch the certificate map from the identity provider
///
/// Any transport failure, non-success status or malformed body is reported
/// as [`Error::KeySourceUnavailable`]. `timeout` bounds the whole exchange,
/// body included.
pub(crate) async fn fetch_certificates(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<FetchedCertificates> {
    let mut response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| source_error(format!("network: {e}")))?;

    if !response.status().is_success() {
        return Err(source_error(format!("http: status {}", response.status())));
    }

    if let Some(length) = response.content_length() {
        if length as usize > MAX_CERTIFICATE_RESPONSE_SIZE {
            return Err(Error::KeySourceResponseTooLarge {
                size: length as usize,
                max: MAX_CERTIFICATE_RESPONSE_SIZE,
            });
        }
    }

    let max_age = parse_max_age(
        response
            .headers()
            .get(reqwest::header::CACHE_CONTROL)
            .and_then(|value| value.to_str().ok()),
    );

    // Chunked responses carry no length up front; count as we read
    let mut body = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| source_error(format!("network: {e}")))?
    {
        let size = body.len() + chunk.len();
        if size > MAX_CERTIFICATE_RESPONSE_SIZE {
            return Err(Error::KeySourceResponseTooLarge {
                size,
                max: MAX_CERTIFICATE_RESPONSE_SIZE,
            });
        }
        body.extend_from_slice(&chunk);
    }

    let certificates = parse_certificate_map(&body)?;

    Ok(FetchedCertificates {
        certificates,
        max_age,
    })
}

/// Parse a certificate endpoint body into a non-empty, bounded map
pub(crate) fn parse_certificate_map(bytes: &[u8]) -> Result<CertificateMap> {
    if bytes.len() > MAX_CERTIFICATE_RESPONSE_SIZE {
        return Err(Error::KeySourceResponseTooLarge {
            size: bytes.len(),
            max: MAX_CERTIFICATE_RESPONSE_SIZE,
        });
    }

    let body = std::str::from_utf8(bytes)
        .map_err(|e| source_error(format!("certificates: utf8 decode failed: {e}")))?;

    let certificates: CertificateMap = miniserde::json::from_str(body)
        .map_err(|_| source_error("certificates: invalid certificate map json"))?;

    if certificates.is_empty() {
        return Err(source_error("certificates: empty certificate map"));
    }

    if certificates.len() > MAX_CERTIFICATE_COUNT {
        return Err(Error::KeySourceTooManyCertificates {
            count: certificates.len(),
            max: MAX_CERTIFICATE_COUNT,
        });
    }

    Ok(certificates)
}

/// Read `max-age` from a `Cache-Control` value
///
/// Falls back to [`DEFAULT_MAX_AGE`] when the header or directive is missing
/// or unparseable.
pub(crate) fn parse_max_age(cache_control: Option<&str>) -> u64 {
    cache_control
        .into_iter()
        .flat_map(|value| value.split(','))
        .filter_map(|directive| {
            let (name, value) = directive.trim().split_once('=')?;
            if !name.trim().eq_ignore_ascii_case("max-age") {
                return None;
            }
            value.trim().trim_matches('"').parse::<u64>().ok()
        })
        .next()
        .map(|max_age| max_age.min(MAX_CERTIFICATE_LIFETIME))
        .unwrap_or(DEFAULT_MAX_AGE)
}

/// TTL for the shared tier: 90% of the upstream lifetime, at least
/// [`MIN_SHARED_TTL`], never beyond the upstream lifetime itself
pub(crate) fn shared_ttl(max_age: u64) -> u64 {
    let retired_early = max_age.saturating_mul(9) / 10;
    retired_early.max(MIN_SHARED_TTL).min(max_age)
}
