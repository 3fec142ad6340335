use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::error::ErrorReport;
use crate::application::reactions::ReactionError;
use crate::application::repos::RepoError;
use crate::domain::error::DomainError;

const SOURCE: &str = "infra::http::api";

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

pub mod codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const INVALID_INPUT: &str = "invalid_input";
    pub const BATCH_TOO_LARGE: &str = "batch_too_large";
    pub const INTEGRITY: &str = "integrity_error";
    pub const DB_TIMEOUT: &str = "db_timeout";
    pub const DB_UNAVAILABLE: &str = "db_unavailable";
    pub const REPO: &str = "repo_error";
    pub const DEADLINE: &str = "deadline_exceeded";
}

#[derive(Debug, Serialize)]
pub struct ApiErrorMessage {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: &'static str,
    hint: Option<String>,
}

impl ApiError {
    pub fn new(
        status: StatusCode,
        code: &'static str,
        message: &'static str,
        hint: Option<String>,
    ) -> Self {
        Self {
            status,
            code,
            message,
            hint,
        }
    }

    pub fn bad_request(message: &'static str, hint: Option<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::BAD_REQUEST, message, hint)
    }

    pub fn unauthorized() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            codes::UNAUTHORIZED,
            "Authenticated user required",
            Some("send the caller id in the x-user-id header".to_string()),
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation { field, message } => ApiError::new(
                StatusCode::BAD_REQUEST,
                codes::INVALID_INPUT,
                "Invalid input",
                Some(format!("{field}: {message}")),
            ),
            DomainError::Invariant { message } => ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::INTEGRITY,
                "Stored data violates an invariant",
                Some(message),
            ),
        }
    }
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Timeout => ApiError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                codes::DB_TIMEOUT,
                "Database timeout",
                None,
            ),
            RepoError::Unavailable(message) => ApiError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                codes::DB_UNAVAILABLE,
                "Database unavailable",
                Some(message),
            ),
            RepoError::Integrity { message } => ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::INTEGRITY,
                "Integrity constraint violated",
                Some(message),
            ),
            RepoError::Persistence(message) => ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::REPO,
                "Persistence error",
                Some(message),
            ),
        }
    }
}

impl From<ReactionError> for ApiError {
    fn from(err: ReactionError) -> Self {
        match err {
            ReactionError::Validation(domain) => domain.into(),
            ReactionError::Unauthenticated => ApiError::unauthorized(),
            ReactionError::BatchTooLarge { requested, limit } => ApiError::new(
                StatusCode::BAD_REQUEST,
                codes::BATCH_TOO_LARGE,
                "Too many targets requested",
                Some(format!("requested {requested}, limit {limit}")),
            ),
            ReactionError::Repo(repo) => repo.into(),
            ReactionError::Cancelled { operation } => ApiError::new(
                StatusCode::GATEWAY_TIMEOUT,
                codes::DEADLINE,
                "Request deadline exceeded",
                Some(format!("{operation} did not complete in time")),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let hint = self.hint.clone();
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code.to_string(),
                message: self.message.to_string(),
                hint: self.hint,
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        ErrorReport::from_message(
            SOURCE,
            self.status,
            format!("{}: {}", self.code, hint.as_deref().unwrap_or(self.message)),
        )
        .attach(&mut response);
        response
    }
}
