//! Reaction vocabulary: kinds, targets, viewers, counters and the toggle state machine.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "reaction_kind", rename_all = "snake_case")]
pub enum ReactionKind {
    Like,
    Dislike,
}

impl ReactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ReactionKind::Like => "like",
            ReactionKind::Dislike => "dislike",
        }
    }
}

impl fmt::Display for ReactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReactionKind {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "like" => Ok(ReactionKind::Like),
            "dislike" => Ok(ReactionKind::Dislike),
            other => Err(DomainError::validation(
                "type",
                format!("reaction type must be `like` or `dislike`, got `{other}`"),
            )),
        }
    }
}

/// Namespace of a reactable entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "reaction_target", rename_all = "snake_case")]
pub enum TargetKind {
    Sound,
    Comment,
}

impl TargetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TargetKind::Sound => "sound",
            TargetKind::Comment => "comment",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strictly positive identifier of a reactable entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct TargetId(i64);

impl TargetId {
    pub fn new(value: i64) -> Result<Self, DomainError> {
        if value <= 0 {
            return Err(DomainError::validation(
                "target_id",
                format!("target id must be positive, got {value}"),
            ));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for TargetId {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TargetId> for i64 {
    fn from(id: TargetId) -> Self {
        id.0
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Target {
    pub kind: TargetKind,
    pub id: TargetId,
}

impl Target {
    pub fn new(kind: TargetKind, id: TargetId) -> Self {
        Self { kind, id }
    }

    pub fn sound(id: TargetId) -> Self {
        Self::new(TargetKind::Sound, id)
    }

    pub fn comment(id: TargetId) -> Self {
        Self::new(TargetKind::Comment, id)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Authenticated user identifier handed over by the authentication layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(i64);

impl UserId {
    pub fn new(value: i64) -> Result<Self, DomainError> {
        if value <= 0 {
            return Err(DomainError::validation(
                "user_id",
                format!("user id must be positive, got {value}"),
            ));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who is reading. Zero or negative raw ids are anonymous callers, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer {
    Anonymous,
    User(UserId),
}

impl Viewer {
    pub fn from_raw(value: Option<i64>) -> Self {
        match value.and_then(|raw| UserId::new(raw).ok()) {
            Some(user) => Viewer::User(user),
            None => Viewer::Anonymous,
        }
    }

    pub fn user(self) -> Option<UserId> {
        match self {
            Viewer::User(user) => Some(user),
            Viewer::Anonymous => None,
        }
    }
}

impl From<UserId> for Viewer {
    fn from(user: UserId) -> Self {
        Viewer::User(user)
    }
}

/// Aggregate counters of one target. This is also the cached snapshot shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionStats {
    pub likes: u64,
    pub dislikes: u64,
}

impl ReactionStats {
    pub fn new(likes: u64, dislikes: u64) -> Self {
        Self { likes, dislikes }
    }

    /// Build from persisted signed counters; storage guarantees they are non-negative.
    pub fn from_counts(likes: i64, dislikes: i64) -> Result<Self, DomainError> {
        let likes = u64::try_from(likes)
            .map_err(|_| DomainError::invariant(format!("negative like counter {likes}")))?;
        let dislikes = u64::try_from(dislikes)
            .map_err(|_| DomainError::invariant(format!("negative dislike counter {dislikes}")))?;
        Ok(Self { likes, dislikes })
    }

    pub fn count(&self, kind: ReactionKind) -> u64 {
        match kind {
            ReactionKind::Like => self.likes,
            ReactionKind::Dislike => self.dislikes,
        }
    }
}

/// Counters merged with the viewer's own reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetReactions {
    pub target: Target,
    pub stats: ReactionStats,
    pub user_reaction: Option<ReactionKind>,
}

/// Store mutations implied by a reaction request, derived from the recorded state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// No previous reaction: count `kind` and record it.
    Add(ReactionKind),
    /// Same kind requested again: uncount it and drop the record.
    Remove(ReactionKind),
    /// Opposite kind requested: move one count from `from` to `to`.
    Switch { from: ReactionKind, to: ReactionKind },
}

impl Transition {
    /// Toggle semantics: re-selecting the recorded kind removes it.
    pub fn toggle(current: Option<ReactionKind>, requested: ReactionKind) -> Self {
        match current {
            None => Transition::Add(requested),
            Some(existing) if existing == requested => Transition::Remove(requested),
            Some(existing) => Transition::Switch {
                from: existing,
                to: requested,
            },
        }
    }

    /// Unconditional removal; `None` when there is nothing recorded.
    pub fn clear(current: Option<ReactionKind>) -> Option<Self> {
        current.map(Transition::Remove)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Transition::Add(_) => "add",
            Transition::Remove(_) => "remove",
            Transition::Switch { .. } => "switch",
        }
    }

    /// Recorded reaction once the transition has been applied.
    pub fn resulting_reaction(&self) -> Option<ReactionKind> {
        match self {
            Transition::Add(kind) => Some(*kind),
            Transition::Remove(_) => None,
            Transition::Switch { to, .. } => Some(*to),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reaction_kind_parses_only_known_values() {
        assert_eq!("like".parse::<ReactionKind>().unwrap(), ReactionKind::Like);
        assert_eq!(
            "dislike".parse::<ReactionKind>().unwrap(),
            ReactionKind::Dislike
        );

        for raw in ["Like", "love", "", " like"] {
            let err = raw.parse::<ReactionKind>().unwrap_err();
            assert!(matches!(err, DomainError::Validation { field: "type", .. }));
        }
    }

    #[test]
    fn ids_must_be_positive() {
        assert!(TargetId::new(1).is_ok());
        assert!(TargetId::new(0).is_err());
        assert!(TargetId::new(-3).is_err());
        assert!(UserId::new(0).is_err());
    }

    #[test]
    fn anonymous_viewer_for_missing_or_zero_ids() {
        assert_eq!(Viewer::from_raw(None), Viewer::Anonymous);
        assert_eq!(Viewer::from_raw(Some(0)), Viewer::Anonymous);
        assert_eq!(Viewer::from_raw(Some(-1)), Viewer::Anonymous);
        assert_eq!(
            Viewer::from_raw(Some(12)),
            Viewer::User(UserId::new(12).unwrap())
        );
    }

    #[test]
    fn toggle_table() {
        use ReactionKind::*;

        assert_eq!(Transition::toggle(None, Like), Transition::Add(Like));
        assert_eq!(Transition::toggle(Some(Like), Like), Transition::Remove(Like));
        assert_eq!(
            Transition::toggle(Some(Dislike), Dislike),
            Transition::Remove(Dislike)
        );
        assert_eq!(
            Transition::toggle(Some(Like), Dislike),
            Transition::Switch {
                from: Like,
                to: Dislike
            }
        );
        assert_eq!(
            Transition::toggle(Some(Dislike), Like).resulting_reaction(),
            Some(Like)
        );
    }

    #[test]
    fn clear_is_noop_without_record() {
        assert_eq!(Transition::clear(None), None);
        assert_eq!(
            Transition::clear(Some(ReactionKind::Dislike)),
            Some(Transition::Remove(ReactionKind::Dislike))
        );
    }

    #[test]
    fn stats_reject_negative_counts() {
        assert_eq!(
            ReactionStats::from_counts(3, 0).unwrap(),
            ReactionStats::new(3, 0)
        );
        assert!(matches!(
            ReactionStats::from_counts(-1, 0),
            Err(DomainError::Invariant { .. })
        ));
    }

    #[test]
    fn target_id_deserialization_validates() {
        let ok: TargetId = serde_json::from_str("5").unwrap();
        assert_eq!(ok.get(), 5);
        assert!(serde_json::from_str::<TargetId>("0").is_err());
    }
}
