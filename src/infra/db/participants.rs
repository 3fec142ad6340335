use std::collections::HashMap;

use async_trait::async_trait;

use crate::{
    application::repos::{ParticipantsRepo, RepoError},
    domain::reactions::{ReactionKind, Target, TargetId, TargetKind, UserId},
};

use super::{PostgresRepositories, map_sqlx_error, to_i64_ids};

#[derive(sqlx::FromRow)]
struct ParticipantRow {
    target_id: i64,
    reaction: ReactionKind,
}

#[async_trait]
impl ParticipantsRepo for PostgresRepositories {
    async fn find_reaction(
        &self,
        user: UserId,
        target: Target,
    ) -> Result<Option<ReactionKind>, RepoError> {
        sqlx::query_scalar::<_, ReactionKind>(
            r#"
            SELECT reaction
            FROM reaction_participants
            WHERE target_kind = $1 AND target_id = $2 AND user_id = $3
            "#,
        )
        .bind(target.kind)
        .bind(target.id.get())
        .bind(user.get())
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn upsert_reaction(
        &self,
        user: UserId,
        target: Target,
        kind: ReactionKind,
    ) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO reaction_participants (target_kind, target_id, user_id, reaction)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (target_kind, target_id, user_id) DO UPDATE
            SET reaction = EXCLUDED.reaction,
                updated_at = now()
            "#,
        )
        .bind(target.kind)
        .bind(target.id.get())
        .bind(user.get())
        .bind(kind)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn remove_reaction(&self, user: UserId, target: Target) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            DELETE FROM reaction_participants
            WHERE target_kind = $1 AND target_id = $2 AND user_id = $3
            "#,
        )
        .bind(target.kind)
        .bind(target.id.get())
        .bind(user.get())
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn find_reactions_batch(
        &self,
        user: UserId,
        kind: TargetKind,
        ids: &[TargetId],
    ) -> Result<HashMap<TargetId, ReactionKind>, RepoError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, ParticipantRow>(
            r#"
            SELECT target_id, reaction
            FROM reaction_participants
            WHERE user_id = $1 AND target_kind = $2 AND target_id = ANY($3)
            "#,
        )
        .bind(user.get())
        .bind(kind)
        .bind(to_i64_ids(ids))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|row| -> Result<_, RepoError> {
                Ok((TargetId::new(row.target_id)?, row.reaction))
            })
            .collect()
    }
}
