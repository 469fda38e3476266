//! HTTP-facing error translation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use fauxhub_compat::{CompatError, DOCS_URL};
use fauxhub_git::GitAccessError;
use serde::Serialize;

/// Error body for API routes.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    pub documentation_url: String,
}

/// Errors surfaced by API handlers.
///
/// NotFound is recovered and translated into the protocol-specific 404
/// shape; everything unexpected lands in `Internal` and becomes a logged
/// 500.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not found")]
    NotFound,
    #[error("no commit found for the ref {0}")]
    NoCommitForRef(String),
    #[error("invalid sha")]
    InvalidSha,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<GitAccessError> for ApiError {
    fn from(err: GitAccessError) -> Self {
        if err.is_not_found() {
            ApiError::NotFound
        } else {
            ApiError::Internal(err.to_string())
        }
    }
}

impl From<CompatError> for ApiError {
    fn from(err: CompatError) -> Self {
        match err {
            CompatError::NotFound => ApiError::NotFound,
            CompatError::NoCommitForRef(reference) => ApiError::NoCommitForRef(reference),
            CompatError::InvalidSha => ApiError::InvalidSha,
            CompatError::BadRequest(msg) => ApiError::BadRequest(msg),
            CompatError::Archive(msg) | CompatError::Upstream(msg) => ApiError::Internal(msg),
        }
    }
}

fn json_error(status: StatusCode, message: String) -> Response {
    (
        status,
        Json(ErrorBody {
            message,
            documentation_url: DOCS_URL.to_string(),
        }),
    )
        .into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound => json_error(StatusCode::NOT_FOUND, "Not Found".to_string()),
            ApiError::NoCommitForRef(reference) => json_error(
                StatusCode::NOT_FOUND,
                format!("No commit found for the ref {reference}"),
            ),
            ApiError::InvalidSha => json_error(
                StatusCode::UNPROCESSABLE_ENTITY,
                "The sha parameter must be exactly 40 characters and contain only [0-9a-f]"
                    .to_string(),
            ),
            ApiError::BadRequest(reason) => {
                tracing::debug!(reason = %reason, "bad request");
                (StatusCode::BAD_REQUEST, "Bad request").into_response()
            }
            ApiError::Internal(reason) => {
                tracing::error!(error = %reason, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}
