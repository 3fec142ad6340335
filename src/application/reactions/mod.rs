//! Reaction engine: toggle state machine, cache-aside reads and the batch reader.

mod commands;
mod locks;
mod queries;
mod service;
mod snapshots;

use std::time::Duration;

use thiserror::Error;

use crate::application::context::DeadlineExceeded;
use crate::application::repos::RepoError;
use crate::domain::error::DomainError;

pub use commands::SetReactionCommand;
pub use locks::{TargetGuard, TargetLocks};
pub use queries::parse_target_ids;
pub use service::ReactionService;
pub use snapshots::{SnapshotLookup, StatsSnapshots};

pub const METRIC_TRANSITION_TOTAL: &str = "tally_reactions_transition_total";
pub const METRIC_BATCH_SIZE: &str = "tally_reactions_batch_size";
pub const METRIC_CACHE_HIT_TOTAL: &str = "tally_cache_hit_total";
pub const METRIC_CACHE_MISS_TOTAL: &str = "tally_cache_miss_total";
pub const METRIC_CACHE_ERROR_TOTAL: &str = "tally_cache_error_total";
pub const METRIC_CACHE_FILL_DISCARDED_TOTAL: &str = "tally_cache_fill_discarded_total";

const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(15 * 60);
const DEFAULT_MAX_BATCH_TARGETS: usize = 100;
/// Own budget for the cache delete that follows a counter write.
const INVALIDATION_GRACE: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum ReactionError {
    #[error(transparent)]
    Validation(#[from] DomainError),
    #[error("authentication required")]
    Unauthenticated,
    #[error("batch of {requested} targets exceeds the limit of {limit}")]
    BatchTooLarge { requested: usize, limit: usize },
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("`{operation}` cancelled: deadline exceeded")]
    Cancelled { operation: &'static str },
}

impl From<DeadlineExceeded> for ReactionError {
    fn from(err: DeadlineExceeded) -> Self {
        ReactionError::Cancelled {
            operation: err.operation,
        }
    }
}

/// Engine tuning resolved from configuration.
#[derive(Debug, Clone)]
pub struct ReactionOptions {
    pub cache_ttl: Duration,
    /// Hold a per-target mutex for the whole toggle (linearizable within one process).
    pub serialize_toggles: bool,
    /// Upper bound applied on top of the caller's deadline.
    pub operation_timeout: Option<Duration>,
    pub max_batch_targets: usize,
}

impl Default for ReactionOptions {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            serialize_toggles: false,
            operation_timeout: None,
            max_batch_targets: DEFAULT_MAX_BATCH_TARGETS,
        }
    }
}
