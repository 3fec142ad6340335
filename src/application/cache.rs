//! Cache port used cache-aside for aggregate snapshots.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),
    #[error("cache payload could not be decoded: {0}")]
    Codec(String),
}

/// Invalidation clock reading handed out on a miss and checked on fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Epoch(pub u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    Hit(String),
    /// The key is absent; a fill must present this epoch to be accepted.
    Miss(Epoch),
}

/// Ephemeral key/value store with TTL. Advisory only: callers never fail a request on its errors.
#[async_trait]
pub trait SnapshotCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<CacheLookup, CacheError>;

    /// Store `value` unless `key` was deleted after `observed` was handed out.
    /// Returns whether the value was installed.
    async fn set(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
        observed: Epoch,
    ) -> Result<bool, CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }
}
