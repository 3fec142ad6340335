use std::time::Instant;

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;
use crate::domain::reactions::Target;

use super::api::viewer::USER_ID_HEADER;

const LOG_TARGET: &str = "tally::http::response";

#[derive(Clone)]
pub struct RequestContext {
    pub request_id: String,
}

/// Reaction write outcome, attached to the response by the write handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedTransition {
    pub target: Target,
    pub transition: &'static str,
}

pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let ctx = RequestContext {
        request_id: request_id.clone(),
    };
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    response.extensions_mut().insert(ctx);
    response
}

/// Logs reaction writes at debug, 4xx at warn and 5xx at error.
pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let user_id = request
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .unwrap_or_default();
    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_default();

    let mut response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = start.elapsed().as_millis() as u64;

    if let Some(applied) = response.extensions().get::<AppliedTransition>() {
        debug!(
            target = LOG_TARGET,
            status = status.as_u16(),
            method = %method,
            path = %path,
            elapsed_ms,
            request_id = %request_id,
            user_id = %user_id,
            reaction_target = %applied.target,
            transition = applied.transition,
            "reaction write completed",
        );
    }

    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    let (source, chain) = match response.extensions_mut().remove::<ErrorReport>() {
        Some(report) => (report.source, report.messages),
        None => ("unknown", Vec::new()),
    };
    let detail = chain
        .first()
        .map(String::as_str)
        .unwrap_or("no diagnostic available");

    if status.is_server_error() {
        error!(
            target = LOG_TARGET,
            status = status.as_u16(),
            method = %method,
            path = %path,
            elapsed_ms,
            request_id = %request_id,
            user_id = %user_id,
            source,
            detail,
            chain = ?chain,
            "reaction request failed",
        );
    } else {
        warn!(
            target = LOG_TARGET,
            status = status.as_u16(),
            method = %method,
            path = %path,
            elapsed_ms,
            request_id = %request_id,
            user_id = %user_id,
            source,
            detail,
            "reaction request rejected",
        );
    }

    response
}
