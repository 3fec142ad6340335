use std::collections::HashMap;

use async_trait::async_trait;

use crate::{
    application::repos::{AggregatesRepo, RepoError},
    domain::reactions::{ReactionKind, ReactionStats, Target, TargetId, TargetKind},
};

use super::{PostgresRepositories, map_sqlx_error, to_i64_ids};

const DECREMENT_LIKES: &str = r#"
    UPDATE reaction_aggregates
    SET likes = likes - 1, updated_at = now()
    WHERE target_kind = $1 AND target_id = $2 AND likes > 0
"#;

const DECREMENT_DISLIKES: &str = r#"
    UPDATE reaction_aggregates
    SET dislikes = dislikes - 1, updated_at = now()
    WHERE target_kind = $1 AND target_id = $2 AND dislikes > 0
"#;

#[derive(sqlx::FromRow)]
struct StatsRow {
    likes: i64,
    dislikes: i64,
}

#[derive(sqlx::FromRow)]
struct StatsBatchRow {
    target_id: i64,
    likes: i64,
    dislikes: i64,
}

fn deltas(kind: ReactionKind) -> (i64, i64) {
    match kind {
        ReactionKind::Like => (1, 0),
        ReactionKind::Dislike => (0, 1),
    }
}

#[async_trait]
impl AggregatesRepo for PostgresRepositories {
    async fn increment_or_create(
        &self,
        target: Target,
        kind: ReactionKind,
    ) -> Result<(), RepoError> {
        let (likes, dislikes) = deltas(kind);
        sqlx::query(
            r#"
            INSERT INTO reaction_aggregates (target_kind, target_id, likes, dislikes)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (target_kind, target_id) DO UPDATE
            SET likes = reaction_aggregates.likes + EXCLUDED.likes,
                dislikes = reaction_aggregates.dislikes + EXCLUDED.dislikes,
                updated_at = now()
            "#,
        )
        .bind(target.kind)
        .bind(target.id.get())
        .bind(likes)
        .bind(dislikes)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn decrement(&self, target: Target, kind: ReactionKind) -> Result<bool, RepoError> {
        let statement = match kind {
            ReactionKind::Like => DECREMENT_LIKES,
            ReactionKind::Dislike => DECREMENT_DISLIKES,
        };
        let result = sqlx::query(statement)
            .bind(target.kind)
            .bind(target.id.get())
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn stats(&self, target: Target) -> Result<ReactionStats, RepoError> {
        let row = sqlx::query_as::<_, StatsRow>(
            r#"
            SELECT likes, dislikes
            FROM reaction_aggregates
            WHERE target_kind = $1 AND target_id = $2
            "#,
        )
        .bind(target.kind)
        .bind(target.id.get())
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        match row {
            Some(row) => Ok(ReactionStats::from_counts(row.likes, row.dislikes)?),
            None => Ok(ReactionStats::default()),
        }
    }

    async fn stats_batch(
        &self,
        kind: TargetKind,
        ids: &[TargetId],
    ) -> Result<HashMap<TargetId, ReactionStats>, RepoError> {
        let mut stats: HashMap<TargetId, ReactionStats> = ids
            .iter()
            .map(|id| (*id, ReactionStats::default()))
            .collect();
        if ids.is_empty() {
            return Ok(stats);
        }

        let rows = sqlx::query_as::<_, StatsBatchRow>(
            r#"
            SELECT target_id, likes, dislikes
            FROM reaction_aggregates
            WHERE target_kind = $1 AND target_id = ANY($2)
            "#,
        )
        .bind(kind)
        .bind(to_i64_ids(ids))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        for row in rows {
            let id = TargetId::new(row.target_id)?;
            stats.insert(id, ReactionStats::from_counts(row.likes, row.dislikes)?);
        }
        Ok(stats)
    }
}
