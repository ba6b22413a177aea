//! Two-tier cache for the identity provider's signing keys
//!
//! ```text
//! key_set(now)
//!     │ local tier fresh?            ──yes──▶ return
//!     │ shared tier entry fresh?     ──yes──▶ import, fill local, return
//!     │ fetch certificate endpoint
//!     │   put shared (TTL = 90% of max-age, floor 60s)
//!     ▼   import, fill local, return
//! ```
//!
//! No lock is held across a refresh. Concurrent callers that all miss will
//! each fetch and write; every writer stores the same upstream truth, so the
//! last write wins harmlessly.

use crate::certs::{
    CertificateMap, SigningKeySet, fetch_certificates, shared_ttl,
};
use crate::config::DEFAULT_FETCH_TIMEOUT;
use crate::error::{Error, Result};
use crate::shared::SharedCache;
use miniserde::{Deserialize, Serialize};
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

/// Prefix of the shared-tier key; the certificate URL is appended
pub const SHARED_KEY_PREFIX: &str = "writeguard:signing-certificates:";

/// Certificate map as stored in the shared tier
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SharedEntry {
    certificates: CertificateMap,
    expires_at: i64,
}

/// Signing key provider backed by a process-local and a shared cache
///
/// The local tier is an optimization only; a fresh process starts empty and
/// repopulates from the shared tier or the network.
#[derive(Clone)]
pub struct RemoteKeyCache {
    client: reqwest::Client,
    certificate_url: String,
    fetch_timeout: Duration,
    shared: Arc<dyn SharedCache>,
    local: Cache<String, Arc<SigningKeySet>>,
}

impl RemoteKeyCache {
    /// Create a cache fetching from `certificate_url` with `client`
    ///
    /// Every fetch is bounded by [`DEFAULT_FETCH_TIMEOUT`] unless changed with
    /// [`RemoteKeyCache::with_fetch_timeout`].
    pub fn new(
        client: reqwest::Client,
        certificate_url: impl Into<String>,
        shared: Arc<dyn SharedCache>,
    ) -> Self {
        Self {
            client,
            certificate_url: certificate_url.into(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            shared,
            local: Cache::builder().max_capacity(16).build(),
        }
    }

    /// Bound each fetch from the identity provider by `timeout`
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Current signing keys at Unix time `now`
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeySourceUnavailable`] (or a size-limit variant) when
    /// both tiers miss and the live fetch fails. Nothing is cached then.
    pub async fn key_set(&self, now: i64) -> Result<Arc<SigningKeySet>> {
        if let Some(set) = self.local.get(&self.certificate_url).await {
            if set.is_fresh(now) {
                tracing::trace!("signing keys served from local tier");
                return Ok(set);
            }
        }

        if let Some(set) = self.load_shared(now).await {
            tracing::trace!("signing keys served from shared tier");
            self.local
                .insert(self.certificate_url.clone(), set.clone())
                .await;
            return Ok(set);
        }

        self.refresh(now).await
    }

    /// Drop the local tier so the next call consults the shared tier
    pub fn reset(&self) {
        self.local.invalidate_all();
    }

    fn shared_key(&self) -> String {
        format!("{SHARED_KEY_PREFIX}{}", self.certificate_url)
    }

    /// Read and import a still-valid shared entry, if any
    ///
    /// Shared-tier failures and undecodable entries count as a miss.
    async fn load_shared(&self, now: i64) -> Option<Arc<SigningKeySet>> {
        let raw = match self.shared.get(&self.shared_key()).await {
            Ok(raw) => raw?,
            Err(error) => {
                tracing::warn!(%error, "shared cache read failed; fetching signing keys");
                return None;
            }
        };

        let entry: SharedEntry = match miniserde::json::from_str(&raw) {
            Ok(entry) => entry,
            Err(_) => {
                tracing::warn!("ignoring undecodable shared signing key entry");
                return None;
            }
        };

        if now >= entry.expires_at {
            return None;
        }

        let set = SigningKeySet::import(&entry.certificates, entry.expires_at);
        if set.is_empty() {
            return None;
        }

        Some(Arc::new(set))
    }

    /// Fetch from the identity provider and populate both tiers
    async fn refresh(&self, now: i64) -> Result<Arc<SigningKeySet>> {
        let fetched = fetch_certificates(&self.client, &self.certificate_url, self.fetch_timeout)
            .await
            .inspect_err(|error| {
                tracing::warn!(%error, url = %self.certificate_url, "signing key fetch failed");
            })?;

        let set = SigningKeySet::import(&fetched.certificates, now + fetched.max_age as i64);
        if set.is_empty() {
            return Err(Error::KeySourceUnavailable(
                "certificates: no usable signing key".into(),
            ));
        }

        let ttl = shared_ttl(fetched.max_age);
        let entry = SharedEntry {
            certificates: fetched.certificates,
            expires_at: now + ttl as i64,
        };

        if let Err(error) = self
            .shared
            .put(
                &self.shared_key(),
                miniserde::json::to_string(&entry),
                Duration::from_secs(ttl),
            )
            .await
        {
            tracing::warn!(%error, "shared cache write failed; keeping fetched signing keys");
        }

        tracing::debug!(
            keys = set.len(),
            max_age = fetched.max_age,
            shared_ttl = ttl,
            "refreshed signing keys"
        );

        let set = Arc::new(set);
        self.local
            .insert(self.certificate_url.clone(), set.clone())
            .await;

        Ok(set)
    }
}
