use std::collections::HashMap;

use metrics::histogram;
use tracing::debug;

use crate::application::context::CallContext;
use crate::domain::error::DomainError;
use crate::domain::reactions::{
    ReactionKind, Target, TargetId, TargetKind, TargetReactions, Viewer,
};

use super::service::{ReactionService, step};
use super::snapshots::SnapshotLookup;
use super::{METRIC_BATCH_SIZE, ReactionError};

const SOURCE: &str = "tally::reactions::queries";

impl ReactionService {
    /// Counters of one target plus the viewer's own reaction.
    pub async fn get_reaction(
        &self,
        ctx: &CallContext,
        viewer: Viewer,
        target: Target,
    ) -> Result<TargetReactions, ReactionError> {
        let ctx = self.scoped(ctx);

        let stats = match self.snapshots.lookup(&ctx, target).await {
            SnapshotLookup::Hit(stats) => stats,
            SnapshotLookup::Miss(epoch) => {
                let stats = step(&ctx, "aggregates.stats", self.aggregates.stats(target)).await?;
                if let Some(epoch) = epoch {
                    self.snapshots.fill(&ctx, target, stats, epoch).await;
                }
                stats
            }
        };

        let user_reaction = match viewer.user() {
            Some(user) => {
                step(
                    &ctx,
                    "participants.find",
                    self.participants.find_reaction(user, target),
                )
                .await?
            }
            None => None,
        };

        Ok(TargetReactions {
            target,
            stats,
            user_reaction,
        })
    }

    /// One record per requested id, in request order, duplicates preserved.
    pub async fn get_reactions(
        &self,
        ctx: &CallContext,
        viewer: Viewer,
        kind: TargetKind,
        ids: &[TargetId],
    ) -> Result<Vec<TargetReactions>, ReactionError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let limit = self.options.max_batch_targets;
        if ids.len() > limit {
            return Err(ReactionError::BatchTooLarge {
                requested: ids.len(),
                limit,
            });
        }

        let ctx = self.scoped(ctx);
        histogram!(METRIC_BATCH_SIZE).record(ids.len() as f64);

        let stats_branch = step(
            &ctx,
            "aggregates.stats_batch",
            self.aggregates.stats_batch(kind, ids),
        );
        let reactions_branch = async {
            match viewer.user() {
                Some(user) => {
                    step(
                        &ctx,
                        "participants.find_batch",
                        self.participants.find_reactions_batch(user, kind, ids),
                    )
                    .await
                }
                None => Ok(HashMap::<TargetId, ReactionKind>::new()),
            }
        };
        let (stats, reactions) = tokio::try_join!(stats_branch, reactions_branch)?;

        debug!(
            target = SOURCE,
            kind = %kind,
            requested = ids.len(),
            stored = stats.len(),
            reacted = reactions.len(),
            "batch reactions loaded"
        );

        Ok(ids
            .iter()
            .map(|id| TargetReactions {
                target: Target::new(kind, *id),
                stats: stats.get(id).copied().unwrap_or_default(),
                user_reaction: reactions.get(id).copied(),
            })
            .collect())
    }
}

/// Parse a comma separated id list such as `5,3,9`. Blank input yields no ids.
pub fn parse_target_ids(raw: &str, limit: usize) -> Result<Vec<TargetId>, ReactionError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Vec::new());
    }

    let ids = raw
        .split(',')
        .map(|part| {
            let part = part.trim();
            let value = part.parse::<i64>().map_err(|_| {
                DomainError::validation("ids", format!("`{part}` is not a valid target id"))
            })?;
            TargetId::new(value)
        })
        .collect::<Result<Vec<_>, _>>()?;

    if ids.len() > limit {
        return Err(ReactionError::BatchTooLarge {
            requested: ids.len(),
            limit,
        });
    }
    Ok(ids)
}
