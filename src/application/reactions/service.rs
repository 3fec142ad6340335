use std::future::Future;
use std::sync::Arc;

use crate::application::cache::SnapshotCache;
use crate::application::context::CallContext;
use crate::application::repos::{AggregatesRepo, ParticipantsRepo};
use crate::domain::reactions::Target;

use super::locks::{TargetGuard, TargetLocks};
use super::snapshots::StatsSnapshots;
use super::{ReactionError, ReactionOptions};

/// Reaction engine. Stateless apart from the injected stores, cache and optional lock table.
#[derive(Clone)]
pub struct ReactionService {
    pub(super) participants: Arc<dyn ParticipantsRepo>,
    pub(super) aggregates: Arc<dyn AggregatesRepo>,
    pub(super) snapshots: StatsSnapshots,
    pub(super) locks: Option<TargetLocks>,
    pub(super) options: ReactionOptions,
}

impl ReactionService {
    pub fn new(
        participants: Arc<dyn ParticipantsRepo>,
        aggregates: Arc<dyn AggregatesRepo>,
        cache: Arc<dyn SnapshotCache>,
        options: ReactionOptions,
    ) -> Self {
        let locks = options.serialize_toggles.then(TargetLocks::new);
        Self {
            participants,
            aggregates,
            snapshots: StatsSnapshots::new(cache, options.cache_ttl),
            locks,
            options,
        }
    }

    pub fn options(&self) -> &ReactionOptions {
        &self.options
    }

    /// Caller deadline clipped by the configured operation timeout.
    pub(super) fn scoped(&self, ctx: &CallContext) -> CallContext {
        ctx.tightened(self.options.operation_timeout)
    }

    pub(super) async fn lock_target(
        &self,
        ctx: &CallContext,
        target: Target,
    ) -> Result<Option<TargetGuard>, ReactionError> {
        match &self.locks {
            Some(locks) => Ok(Some(ctx.run("lock.acquire", locks.acquire(target)).await?)),
            None => Ok(None),
        }
    }
}

/// Run one store call under the deadline, keeping its error untranslated.
pub(super) async fn step<T, E, F>(
    ctx: &CallContext,
    operation: &'static str,
    call: F,
) -> Result<T, ReactionError>
where
    F: Future<Output = Result<T, E>>,
    E: Into<ReactionError>,
{
    ctx.run(operation, call).await?.map_err(Into::into)
}
