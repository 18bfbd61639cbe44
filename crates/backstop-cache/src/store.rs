//! The backend capability shared by the local and remote tiers.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::CacheResult;

/// Which tier a store belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheTier {
    Local,
    Remote,
}

impl CacheTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheTier::Local => "local",
            CacheTier::Remote => "remote",
        }
    }
}

impl fmt::Display for CacheTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A byte-oriented key-value store with per-entry TTL.
///
/// Implementations report their failures; deciding what a failure means for
/// the caller is left to [`crate::CacheService`].
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get the raw value stored under `key`.
    ///
    /// Returns `Ok(None)` if the key is absent or expired.
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Store `value` under `key`, replacing any previous entry.
    ///
    /// A zero `ttl` stores the entry without expiry.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()>;

    /// Remove `key`. Removing an absent key is not an error.
    async fn del(&self, key: &str) -> CacheResult<()>;

    /// Remove every key matching a glob `pattern` and return how many went.
    async fn del_by_pattern(&self, pattern: &str) -> CacheResult<usize>;

    fn tier(&self) -> CacheTier;
}
