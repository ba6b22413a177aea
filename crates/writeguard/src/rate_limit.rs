//! Fixed-window throttle for public write endpoints
//!
//! One marker per key lives in the [`SharedCache`]; while it exists the key is
//! throttled. Markers disappear through the cache's own TTL.
//!
//! [`RateLimiter::check`] only reads. The caller performs its action and then
//! calls [`RateLimiter::record`], so a failed action never starts a window.
//! Two requests for the same key arriving before the first marker write lands
//! may both be allowed. There is no burst allowance.

use crate::error::Result;
use crate::shared::SharedCache;
use std::sync::Arc;
use std::time::Duration;

/// Prefix of every marker key
pub const RATE_KEY_PREFIX: &str = "writeguard:rate:";

const MARKER: &str = "1";

/// Outcome of [`RateLimiter::check`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimit {
    /// The caller may act, then record the action
    Allowed,
    /// The caller acted within the window; return prior state instead
    Throttled,
}

impl RateLimit {
    pub fn is_allowed(self) -> bool {
        self == RateLimit::Allowed
    }
}

/// Per-key gate with a fixed window length
#[derive(Clone)]
pub struct RateLimiter {
    shared: Arc<dyn SharedCache>,
    ttl: Duration,
}

impl RateLimiter {
    pub fn new(shared: Arc<dyn SharedCache>, ttl: Duration) -> Self {
        Self { shared, ttl }
    }

    /// Marker key for `caller` performing `action`
    pub fn key(action: &str, caller: &str) -> String {
        format!("{RATE_KEY_PREFIX}{action}:{caller}")
    }

    /// Whether `key` may act now
    ///
    /// Does not open a window; see [`RateLimiter::record`].
    ///
    /// # Errors
    ///
    /// Shared cache failures are returned as-is; the caller decides whether
    /// to fail open or closed.
    pub async fn check(&self, key: &str) -> Result<RateLimit> {
        if self.shared.get(key).await?.is_some() {
            tracing::debug!(key, "rate limited");
            return Ok(RateLimit::Throttled);
        }

        Ok(RateLimit::Allowed)
    }

    /// Open a window for `key` after its action succeeded
    ///
    /// # Errors
    ///
    /// Returns the shared cache failure; the action has already happened.
    pub async fn record(&self, key: &str) -> Result<()> {
        self.shared.put(key, MARKER.to_string(), self.ttl).await?;
        tracing::trace!(key, ttl = ?self.ttl, "rate window opened");
        Ok(())
    }

    /// Window length, e.g. for a `Retry-After` hint
    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
