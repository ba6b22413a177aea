use crate::access::AccessDecision;
use crate::certs::caching::RemoteKeyCache;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::rate_limit::RateLimiter;
use crate::shared::SharedCache;
use crate::validator::TokenVerifier;
use std::sync::Arc;
use std::time::Duration;

/// Everything a write handler needs, built once from a [`Config`]
///
/// Cheap to clone; clones share the key cache and the shared cache handle.
#[derive(Clone)]
pub struct Guard {
    keys: Arc<RemoteKeyCache>,
    verifier: TokenVerifier,
    access: AccessDecision,
    shared: Arc<dyn SharedCache>,
}

impl Guard {
    /// Wire the key cache, verifier and access decision for `config`
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigurationInvalid`] when the HTTP client cannot be
    /// built.
    pub fn new(config: &Config, shared: Arc<dyn SharedCache>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.fetch_timeout())
            .build()
            .map_err(|e| Error::ConfigurationInvalid(format!("http client: {e}")))?;

        let keys = Arc::new(
            RemoteKeyCache::new(client, config.certificate_url(), shared.clone())
                .with_fetch_timeout(config.fetch_timeout()),
        );

        let verifier = TokenVerifier::new(config.issuer(), config.audience(), keys.clone());

        let access = AccessDecision::new(
            verifier.clone(),
            config.admin_emails().clone(),
            config.admin_secret().map(str::to_string),
            config.secret_header().clone(),
        );

        tracing::debug!(
            project = config.project_id(),
            admins = config.admin_emails().len(),
            secret = config.admin_secret().is_some(),
            "writeguard ready"
        );

        Ok(Self {
            keys,
            verifier,
            access,
            shared,
        })
    }

    pub fn access(&self) -> &AccessDecision {
        &self.access
    }

    pub fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }

    pub fn keys(&self) -> &RemoteKeyCache {
        &self.keys
    }

    /// Rate limiter with a window of `ttl`, backed by the same shared cache
    pub fn rate_limiter(&self, ttl: Duration) -> RateLimiter {
        RateLimiter::new(self.shared.clone(), ttl)
    }
}
