//! Repository traits describing persistence adapters.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::error::DomainError;
use crate::domain::reactions::{ReactionKind, ReactionStats, Target, TargetId, TargetKind, UserId};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn unavailable(err: impl std::fmt::Display) -> Self {
        Self::Unavailable(err.to_string())
    }

    /// Connectivity and timeout failures; the request may succeed if retried later.
    pub fn is_transient(&self) -> bool {
        matches!(self, RepoError::Unavailable(_) | RepoError::Timeout)
    }
}

impl From<DomainError> for RepoError {
    fn from(err: DomainError) -> Self {
        RepoError::Integrity {
            message: err.to_string(),
        }
    }
}

/// Per-user reaction records, unique per (target, user).
#[async_trait]
pub trait ParticipantsRepo: Send + Sync {
    async fn find_reaction(
        &self,
        user: UserId,
        target: Target,
    ) -> Result<Option<ReactionKind>, RepoError>;

    /// Insert or overwrite the user's reaction in one statement.
    async fn upsert_reaction(
        &self,
        user: UserId,
        target: Target,
        kind: ReactionKind,
    ) -> Result<(), RepoError>;

    /// Deleting an absent record succeeds.
    async fn remove_reaction(&self, user: UserId, target: Target) -> Result<(), RepoError>;

    /// Only targets with a recorded reaction appear in the result.
    async fn find_reactions_batch(
        &self,
        user: UserId,
        kind: TargetKind,
        ids: &[TargetId],
    ) -> Result<HashMap<TargetId, ReactionKind>, RepoError>;
}

/// Per-target counters, mutated only through single atomic statements.
#[async_trait]
pub trait AggregatesRepo: Send + Sync {
    /// Create the row with `kind` at one, or bump only the `kind` counter.
    async fn increment_or_create(&self, target: Target, kind: ReactionKind)
    -> Result<(), RepoError>;

    /// Decrement `kind` when it is above zero. Returns whether a counter changed.
    async fn decrement(&self, target: Target, kind: ReactionKind) -> Result<bool, RepoError>;

    /// Zero counters for unknown targets.
    async fn stats(&self, target: Target) -> Result<ReactionStats, RepoError>;

    /// Contains every requested id; unknown ids map to zero counters.
    async fn stats_batch(
        &self,
        kind: TargetKind,
        ids: &[TargetId],
    ) -> Result<HashMap<TargetId, ReactionStats>, RepoError>;
}

#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn health_check(&self) -> Result<(), RepoError>;
}
