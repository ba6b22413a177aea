//! Authorization gate for the privileged and public write paths of a small API.
//!
//! - [`AccessDecision`] answers "is this request an admin?" from a verified
//!   identity token or a shared secret.
//! - [`RateLimiter`] throttles public writes with a fixed window per key.
//! - [`TokenVerifier`] checks RS256 identity tokens against the provider's
//!   signing certificates, held by a two-tier [`RemoteKeyCache`].
//!
//! [`Guard`] builds all of them from one [`Config`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use writeguard::{Config, Guard, MemoryCache};
//!
//! # async fn run(headers: http::HeaderMap) -> writeguard::Result<()> {
//! let config = Config::from_env()?;
//! let guard = Guard::new(&config, Arc::new(MemoryCache::default()))?;
//!
//! if guard.access().is_admin(&headers).await {
//!     // mutate state
//! }
//! # Ok(())
//! # }
//! ```

mod error;

pub mod cert;
pub mod certs;
pub mod shared;

// Internal modules
pub(crate) mod access;
pub(crate) mod algorithm;
pub(crate) mod claims;
pub(crate) mod config;
pub(crate) mod guard;
pub(crate) mod header;
pub(crate) mod limits;
pub(crate) mod rate_limit;
pub(crate) mod utils;
pub(crate) mod validator;

#[cfg(test)]
mod testutil;

// Public Interface
pub use access::{AccessDecision, AdminAllowList};
pub use algorithm::Algorithm;
pub use certs::SigningKeySet;
pub use certs::caching::RemoteKeyCache;
pub use claims::TokenClaims;
pub use config::{Config, ConfigBuilder};
pub use error::{Error, Rejection, Result};
pub use guard::Guard;
pub use rate_limit::{RateLimit, RateLimiter};
pub use shared::{MemoryCache, SharedCache};
pub use validator::TokenVerifier;
