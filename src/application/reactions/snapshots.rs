use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tracing::{debug, warn};

use crate::application::cache::{CacheError, CacheLookup, Epoch, SnapshotCache};
use crate::application::context::CallContext;
use crate::cache::stats_key;
use crate::domain::reactions::{ReactionStats, Target};

use super::{
    METRIC_CACHE_ERROR_TOTAL, METRIC_CACHE_FILL_DISCARDED_TOTAL, METRIC_CACHE_HIT_TOTAL,
    METRIC_CACHE_MISS_TOTAL,
};

const SOURCE: &str = "tally::reactions::snapshots";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotLookup {
    Hit(ReactionStats),
    /// Nothing usable cached. `None` when the cache failed and must not be filled.
    Miss(Option<Epoch>),
}

/// Cache-aside access to aggregate snapshots. Every failure is logged and swallowed.
#[derive(Clone)]
pub struct StatsSnapshots {
    cache: Arc<dyn SnapshotCache>,
    ttl: Duration,
}

impl StatsSnapshots {
    pub fn new(cache: Arc<dyn SnapshotCache>, ttl: Duration) -> Self {
        Self { cache, ttl }
    }

    pub async fn lookup(&self, ctx: &CallContext, target: Target) -> SnapshotLookup {
        let key = stats_key(target);
        let result = match ctx.run("cache.get", self.cache.get(&key)).await {
            Ok(result) => result,
            Err(deadline) => Err(CacheError::Unavailable(format!(
                "{} deadline exceeded",
                deadline.operation
            ))),
        };

        match result {
            Ok(CacheLookup::Hit(payload)) => match serde_json::from_str::<ReactionStats>(&payload) {
                Ok(stats) => {
                    counter!(METRIC_CACHE_HIT_TOTAL).increment(1);
                    debug!(target = SOURCE, key = %key, "reaction stats loaded from cache");
                    SnapshotLookup::Hit(stats)
                }
                Err(err) => {
                    report("decode", &key, &CacheError::Codec(err.to_string()));
                    SnapshotLookup::Miss(None)
                }
            },
            Ok(CacheLookup::Miss(epoch)) => {
                counter!(METRIC_CACHE_MISS_TOTAL).increment(1);
                SnapshotLookup::Miss(Some(epoch))
            }
            Err(err) => {
                report("get", &key, &err);
                SnapshotLookup::Miss(None)
            }
        }
    }

    pub async fn fill(&self, ctx: &CallContext, target: Target, stats: ReactionStats, epoch: Epoch) {
        let key = stats_key(target);
        let payload = match serde_json::to_string(&stats) {
            Ok(payload) => payload,
            Err(err) => {
                report("encode", &key, &CacheError::Codec(err.to_string()));
                return;
            }
        };

        match ctx
            .run("cache.set", self.cache.set(&key, payload, self.ttl, epoch))
            .await
        {
            Ok(Ok(true)) => {}
            Ok(Ok(false)) => {
                counter!(METRIC_CACHE_FILL_DISCARDED_TOTAL).increment(1);
                debug!(
                    target = SOURCE,
                    key = %key,
                    "discarded stale fill after concurrent invalidation"
                );
            }
            Ok(Err(err)) => report("set", &key, &err),
            Err(deadline) => report(
                "set",
                &key,
                &CacheError::Unavailable(format!("{} deadline exceeded", deadline.operation)),
            ),
        }
    }

    pub async fn invalidate(&self, ctx: &CallContext, target: Target) {
        let key = stats_key(target);
        match ctx.run("cache.delete", self.cache.delete(&key)).await {
            Ok(Ok(())) => debug!(target = SOURCE, key = %key, "reaction cache invalidated"),
            Ok(Err(err)) => report("delete", &key, &err),
            Err(deadline) => report(
                "delete",
                &key,
                &CacheError::Unavailable(format!("{} deadline exceeded", deadline.operation)),
            ),
        }
    }
}

fn report(op: &'static str, key: &str, err: &CacheError) {
    counter!(METRIC_CACHE_ERROR_TOTAL, "op" => op).increment(1);
    warn!(
        target = SOURCE,
        op,
        key,
        error = %err,
        "reaction cache operation failed; falling back to the store"
    );
}
