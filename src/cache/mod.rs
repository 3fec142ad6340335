//! In-process snapshot cache for aggregate counters.
//!
//! Entries are serialized `ReactionStats` keyed by target. Deletes leave a
//! tombstone stamped with the invalidation clock so that a fill computed from a
//! read older than the delete is discarded instead of installed.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! capacity = 10000
//! ttl_seconds = 900
//! ```

mod config;
mod keys;
mod lock;
mod store;

use std::sync::Arc;

use crate::application::cache::SnapshotCache;

pub use config::CacheConfig;
pub use keys::{STATS_KEY_PREFIX, stats_key};
pub use store::{DisabledCache, SnapshotStore};

/// Pick the cache implementation for the given configuration.
pub fn build_snapshot_cache(config: &CacheConfig) -> Arc<dyn SnapshotCache> {
    if config.enabled {
        Arc::new(SnapshotStore::new(config))
    } else {
        Arc::new(DisabledCache)
    }
}
