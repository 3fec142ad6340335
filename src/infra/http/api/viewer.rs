//! Caller identity forwarded by the upstream gateway.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::domain::reactions::Viewer;

use super::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// Extracts the viewer from `x-user-id`. Absent, empty or non-positive ids are anonymous.
#[derive(Debug, Clone, Copy)]
pub struct RequestViewer(pub Viewer);

impl<S> FromRequestParts<S> for RequestViewer
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(USER_ID_HEADER) else {
            return Ok(Self(Viewer::Anonymous));
        };

        let raw = value
            .to_str()
            .map_err(|_| ApiError::bad_request("Malformed x-user-id header", None))?
            .trim();
        if raw.is_empty() {
            return Ok(Self(Viewer::Anonymous));
        }

        let id = raw.parse::<i64>().map_err(|err| {
            ApiError::bad_request("Malformed x-user-id header", Some(err.to_string()))
        })?;
        Ok(Self(Viewer::from_raw(Some(id))))
    }
}
