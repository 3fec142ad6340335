//! Wire types shared by the tally HTTP API and its clients.
//!
//! Reaction kinds travel as plain strings (`"like"` / `"dislike"`); the server
//! validates them once at the boundary and never trusts the raw value further.

use serde::{Deserialize, Serialize};

/// Body of `PUT /api/{sounds,comments}/{id}/reactions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetReactionRequest {
    #[serde(rename = "type")]
    pub reaction_type: String,
}

/// Reaction counters for one target, plus the caller's own reaction when known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionSummary {
    pub target_id: i64,
    pub likes: u64,
    pub dislikes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_reaction: Option<String>,
}

/// Query string of the batch endpoint: `?ids=5,3,9`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionBatchQuery {
    #[serde(default)]
    pub ids: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub database: ComponentStatus,
    pub cache: ComponentStatus,
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_omits_missing_user_reaction() {
        let summary = ReactionSummary {
            target_id: 9,
            likes: 0,
            dislikes: 0,
            user_reaction: None,
        };

        let json = serde_json::to_value(&summary).expect("serialize summary");
        assert_eq!(
            json,
            serde_json::json!({"target_id": 9, "likes": 0, "dislikes": 0})
        );
    }

    #[test]
    fn set_request_reads_type_field() {
        let request: SetReactionRequest =
            serde_json::from_str(r#"{"type":"dislike"}"#).expect("parse request");
        assert_eq!(request.reaction_type, "dislike");
    }
}
