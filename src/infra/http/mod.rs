pub mod api;
mod middleware;

pub use api::{ApiState, build_api_router};
pub use middleware::{AppliedTransition, RequestContext, log_responses, set_request_context};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router, middleware as axum_middleware};
use tally_api_types::{ComponentStatus, HealthReport};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::application::error::ErrorReport;

const HEALTH_SOURCE: &str = "infra::http::health";

/// Full application router: reaction API, health probe and shared middleware.
pub fn build_router(state: ApiState) -> Router {
    let health = Router::new()
        .route("/health", get(health_check))
        .with_state(state.clone());

    build_api_router(state)
        .merge(health)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

async fn health_check(State(state): State<ApiState>) -> Response {
    let ctx = state.call_context();
    let (database, cache) = tokio::join!(
        ctx.run("health.database", state.health.health_check()),
        ctx.run("health.cache", state.cache.ping()),
    );

    let mut failures = Vec::new();
    let database = match database {
        Ok(Ok(())) => ComponentStatus::Healthy,
        Ok(Err(err)) => {
            failures.push(format!("database: {err}"));
            ComponentStatus::Unhealthy
        }
        Err(deadline) => {
            failures.push(format!("database: {} timed out", deadline.operation));
            ComponentStatus::Unhealthy
        }
    };
    let cache = match cache {
        Ok(Ok(())) => ComponentStatus::Healthy,
        Ok(Err(err)) => {
            failures.push(format!("cache: {err}"));
            ComponentStatus::Unhealthy
        }
        Err(deadline) => {
            failures.push(format!("cache: {} timed out", deadline.operation));
            ComponentStatus::Unhealthy
        }
    };

    let healthy = failures.is_empty();
    let report = HealthReport {
        status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
        database,
        cache,
        timestamp: OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default(),
    };

    if healthy {
        return (StatusCode::OK, Json(report)).into_response();
    }

    let mut response = (StatusCode::SERVICE_UNAVAILABLE, Json(report)).into_response();
    ErrorReport {
        source: HEALTH_SOURCE,
        status: StatusCode::SERVICE_UNAVAILABLE,
        messages: failures,
    }
    .attach(&mut response);
    response
}
