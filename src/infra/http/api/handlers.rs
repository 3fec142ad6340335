//! Reaction handlers

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tally_api_types::{ReactionBatchQuery, ReactionSummary, SetReactionRequest};
use tracing::debug;

use crate::application::reactions::{SetReactionCommand, parse_target_ids};
use crate::domain::reactions::{Target, TargetId, TargetKind, TargetReactions};
use crate::infra::http::AppliedTransition;

use super::error::ApiError;
use super::state::ApiState;
use super::viewer::RequestViewer;

const SOURCE: &str = "tally::http::reactions";

fn summary(reactions: TargetReactions) -> ReactionSummary {
    ReactionSummary {
        target_id: reactions.target.id.get(),
        likes: reactions.stats.likes,
        dislikes: reactions.stats.dislikes,
        user_reaction: reactions
            .user_reaction
            .map(|kind| kind.as_str().to_string()),
    }
}

fn raw_target_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, ApiError> {
    path.map(|Path(id)| id)
        .map_err(|err| ApiError::bad_request("Invalid target id", Some(err.body_text())))
}

pub async fn set_reaction(
    State(state): State<ApiState>,
    Extension(kind): Extension<TargetKind>,
    RequestViewer(viewer): RequestViewer,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<SetReactionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    if viewer.user().is_none() {
        return Err(ApiError::unauthorized());
    }
    let raw_id = raw_target_id(path)?;
    let Json(body) =
        body.map_err(|err| ApiError::bad_request("Invalid request body", Some(err.body_text())))?;

    let command = SetReactionCommand::parse(viewer, kind, raw_id, &body.reaction_type)?;
    let transition = state
        .reactions
        .set_reaction(&state.call_context(), command)
        .await?;

    debug!(
        target = SOURCE,
        target_ref = %command.target,
        transition = transition.label(),
        "reaction set"
    );
    Ok((
        StatusCode::NO_CONTENT,
        Extension(AppliedTransition {
            target: command.target,
            transition: transition.label(),
        }),
    ))
}

pub async fn clear_reaction(
    State(state): State<ApiState>,
    Extension(kind): Extension<TargetKind>,
    RequestViewer(viewer): RequestViewer,
    path: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let user = viewer.user().ok_or_else(ApiError::unauthorized)?;
    let id = TargetId::new(raw_target_id(path)?)?;

    let target = Target::new(kind, id);
    let cleared = state
        .reactions
        .clear_reaction(&state.call_context(), user, target)
        .await?;

    let applied = cleared.map(|transition| {
        Extension(AppliedTransition {
            target,
            transition: transition.label(),
        })
    });
    Ok((StatusCode::NO_CONTENT, applied, ()))
}

pub async fn get_reaction(
    State(state): State<ApiState>,
    Extension(kind): Extension<TargetKind>,
    RequestViewer(viewer): RequestViewer,
    path: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = TargetId::new(raw_target_id(path)?)?;

    let reactions = state
        .reactions
        .get_reaction(&state.call_context(), viewer, Target::new(kind, id))
        .await?;

    Ok(Json(summary(reactions)))
}

pub async fn get_reactions(
    State(state): State<ApiState>,
    Extension(kind): Extension<TargetKind>,
    RequestViewer(viewer): RequestViewer,
    query: Result<Query<ReactionBatchQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) =
        query.map_err(|err| ApiError::bad_request("Invalid query", Some(err.body_text())))?;
    let limit = state.reactions.options().max_batch_targets;
    let ids = parse_target_ids(&query.ids, limit)?;

    let records = state
        .reactions
        .get_reactions(&state.call_context(), viewer, kind, &ids)
        .await?;

    Ok(Json(records.into_iter().map(summary).collect::<Vec<_>>()))
}
