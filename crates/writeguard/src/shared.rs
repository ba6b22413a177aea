//! Shared key-value cache contract
//!
//! The shared cache is the only coordination point between requests and
//! between process instances. It offers no transactions or locking: values
//! written here are re-derivable from upstream, so racing writers are
//! harmless.

use crate::error::Result;
use async_trait::async_trait;
use moka::future::Cache;
use std::time::{Duration, Instant};

/// Default capacity of [`MemoryCache`]
pub const DEFAULT_MEMORY_CAPACITY: u64 = 10_000;

/// External key-value store with per-entry TTL
///
/// Implementations must be `Send + Sync`; every method takes `&self`.
#[async_trait]
pub trait SharedCache: Send + Sync {
    /// Return the value stored under `key`, or `None` when absent or expired
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value, for `ttl`
    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<()>;
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    ttl: Duration,
}

/// Per-entry expiry: each write restarts the entry's own TTL
struct EntryExpiry;

impl moka::Expiry<String, Entry> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Entry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-process [`SharedCache`] backed by [`moka::future::Cache`]
///
/// Suitable for tests and single-instance deployments. Entries expire after
/// their own TTL and the cache is capacity-bounded.
#[derive(Clone)]
pub struct MemoryCache {
    entries: Cache<String, Entry>,
}

impl MemoryCache {
    /// Create a cache holding at most `max_capacity` entries
    pub fn new(max_capacity: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(EntryExpiry)
            .build();
        Self { entries }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_CAPACITY)
    }
}

#[async_trait]
impl SharedCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).await.map(|entry| entry.value))
    }

    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        self.entries.insert(key.to_string(), Entry { value, ttl }).await;
        Ok(())
    }
}
