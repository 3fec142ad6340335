use metrics::counter;
use tracing::{debug, info, warn};

use crate::application::context::CallContext;
use crate::domain::reactions::{
    ReactionKind, Target, TargetId, TargetKind, Transition, UserId, Viewer,
};

use super::service::{ReactionService, step};
use super::{INVALIDATION_GRACE, METRIC_TRANSITION_TOTAL, ReactionError};

const SOURCE: &str = "tally::reactions::commands";

/// Validated write request. Authentication is checked before the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetReactionCommand {
    pub user: UserId,
    pub target: Target,
    pub kind: ReactionKind,
}

impl SetReactionCommand {
    pub fn parse(
        viewer: Viewer,
        target_kind: TargetKind,
        raw_id: i64,
        raw_type: &str,
    ) -> Result<Self, ReactionError> {
        let user = viewer.user().ok_or(ReactionError::Unauthenticated)?;
        let id = TargetId::new(raw_id)?;
        let kind = raw_type.parse::<ReactionKind>()?;
        Ok(Self {
            user,
            target: Target::new(target_kind, id),
            kind,
        })
    }
}

impl ReactionService {
    /// Toggle the caller's reaction on a target and return the applied transition.
    pub async fn set_reaction(
        &self,
        ctx: &CallContext,
        command: SetReactionCommand,
    ) -> Result<Transition, ReactionError> {
        let ctx = self.scoped(ctx);
        let _guard = self.lock_target(&ctx, command.target).await?;

        let current = step(
            &ctx,
            "participants.find",
            self.participants.find_reaction(command.user, command.target),
        )
        .await?;
        let transition = Transition::toggle(current, command.kind);

        self.apply(&ctx, command.user, command.target, transition)
            .await?;
        Ok(transition)
    }

    /// Drop the caller's reaction whatever its kind. `None` when nothing was recorded.
    pub async fn clear_reaction(
        &self,
        ctx: &CallContext,
        user: UserId,
        target: Target,
    ) -> Result<Option<Transition>, ReactionError> {
        let ctx = self.scoped(ctx);
        let _guard = self.lock_target(&ctx, target).await?;

        let current = step(
            &ctx,
            "participants.find",
            self.participants.find_reaction(user, target),
        )
        .await?;
        let Some(transition) = Transition::clear(current) else {
            debug!(
                target = SOURCE,
                user_id = %user,
                target_ref = %target,
                "no reaction to clear"
            );
            return Ok(None);
        };

        self.apply(&ctx, user, target, transition).await?;
        Ok(Some(transition))
    }

    async fn apply(
        &self,
        ctx: &CallContext,
        user: UserId,
        target: Target,
        transition: Transition,
    ) -> Result<(), ReactionError> {
        let mut touched = false;
        let outcome = self
            .apply_steps(ctx, user, target, transition, &mut touched)
            .await;

        // A counter write may have committed even when its call failed or was cut
        // off, and the caller's deadline may already be spent.
        if touched {
            let grace = CallContext::with_timeout(INVALIDATION_GRACE);
            self.snapshots.invalidate(&grace, target).await;
        }

        match outcome {
            Ok(()) => {
                counter!(METRIC_TRANSITION_TOTAL, "transition" => transition.label()).increment(1);
                info!(
                    target = SOURCE,
                    user_id = %user,
                    target_ref = %target,
                    transition = transition.label(),
                    reaction = ?transition.resulting_reaction(),
                    "reaction transition applied"
                );
                Ok(())
            }
            Err(err) => {
                warn!(
                    target = SOURCE,
                    user_id = %user,
                    target_ref = %target,
                    transition = transition.label(),
                    counters_touched = touched,
                    error = %err,
                    "reaction transition aborted"
                );
                Err(err)
            }
        }
    }

    async fn apply_steps(
        &self,
        ctx: &CallContext,
        user: UserId,
        target: Target,
        transition: Transition,
        touched: &mut bool,
    ) -> Result<(), ReactionError> {
        // Every transition opens with a counter write; once it is in flight the
        // store may have changed regardless of what the call returns.
        *touched = true;
        match transition {
            Transition::Add(kind) => {
                step(
                    ctx,
                    "aggregates.increment",
                    self.aggregates.increment_or_create(target, kind),
                )
                .await?;
                step(
                    ctx,
                    "participants.upsert",
                    self.participants.upsert_reaction(user, target, kind),
                )
                .await
            }
            Transition::Remove(kind) => {
                self.decrement(ctx, target, kind).await?;
                step(
                    ctx,
                    "participants.remove",
                    self.participants.remove_reaction(user, target),
                )
                .await
            }
            Transition::Switch { from, to } => {
                self.decrement(ctx, target, from).await?;
                step(
                    ctx,
                    "aggregates.increment",
                    self.aggregates.increment_or_create(target, to),
                )
                .await?;
                step(
                    ctx,
                    "participants.upsert",
                    self.participants.upsert_reaction(user, target, to),
                )
                .await
            }
        }
    }

    async fn decrement(
        &self,
        ctx: &CallContext,
        target: Target,
        kind: ReactionKind,
    ) -> Result<(), ReactionError> {
        let changed = step(
            ctx,
            "aggregates.decrement",
            self.aggregates.decrement(target, kind),
        )
        .await?;
        if !changed {
            warn!(
                target = SOURCE,
                target_ref = %target,
                kind = %kind,
                "counter already at zero; decrement skipped"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::DomainError;

    fn viewer(id: i64) -> Viewer {
        Viewer::from_raw(Some(id))
    }

    #[test]
    fn parse_accepts_valid_request() {
        let command = SetReactionCommand::parse(viewer(3), TargetKind::Comment, 9, "dislike")
            .expect("valid command");
        assert_eq!(command.user.get(), 3);
        assert_eq!(command.target.kind, TargetKind::Comment);
        assert_eq!(command.target.id.get(), 9);
        assert_eq!(command.kind, ReactionKind::Dislike);
    }

    #[test]
    fn parse_checks_authentication_first() {
        let err = SetReactionCommand::parse(Viewer::Anonymous, TargetKind::Sound, 0, "meh")
            .unwrap_err();
        assert!(matches!(err, ReactionError::Unauthenticated));
    }

    #[test]
    fn parse_rejects_bad_payload() {
        let err = SetReactionCommand::parse(viewer(1), TargetKind::Sound, 0, "like").unwrap_err();
        assert!(matches!(
            err,
            ReactionError::Validation(DomainError::Validation {
                field: "target_id",
                ..
            })
        ));

        let err = SetReactionCommand::parse(viewer(1), TargetKind::Sound, 4, "love").unwrap_err();
        assert!(matches!(
            err,
            ReactionError::Validation(DomainError::Validation { field: "type", .. })
        ));
    }
}
