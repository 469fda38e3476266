//! Error types for the compatibility layer.

use thiserror::Error;

/// Result type for compatibility operations.
pub type Result<T> = std::result::Result<T, CompatError>;

/// Link emitted in GitHub-shaped error bodies.
pub const DOCS_URL: &str = "https://docs.github.com/rest";

/// Errors that can occur while producing GitHub-shaped responses.
#[derive(Debug, Error)]
pub enum CompatError {
    /// Ref, SHA, object, or path resolves to nothing.
    #[error("not found")]
    NotFound,

    /// Contents lookup failed to resolve its ref.
    #[error("no commit found for the ref {0}")]
    NoCommitForRef(String),

    /// SHA parameter is not exactly 40 lowercase hex characters.
    #[error("invalid sha")]
    InvalidSha,

    /// Malformed query or parameters.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Archive generation failed.
    #[error("archive generation failed: {0}")]
    Archive(String),

    /// Child process or stream failure.
    #[error("upstream failure: {0}")]
    Upstream(String),
}

impl CompatError {
    /// HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::NoCommitForRef(_) => 404,
            Self::InvalidSha => 422,
            Self::BadRequest(_) => 400,
            Self::Archive(_) => 500,
            Self::Upstream(_) => 500,
        }
    }

    /// The GitHub-compatible error message.
    pub fn github_message(&self) -> String {
        match self {
            Self::NotFound => "Not Found".to_string(),
            Self::NoCommitForRef(reference) => {
                format!("No commit found for the ref {reference}")
            }
            Self::InvalidSha => "The sha parameter must be exactly 40 characters and contain only [0-9a-f]".to_string(),
            Self::BadRequest(_) => "Bad request".to_string(),
            Self::Archive(_) | Self::Upstream(_) => "Server Error".to_string(),
        }
    }
}

impl From<fauxhub_git::GitAccessError> for CompatError {
    fn from(err: fauxhub_git::GitAccessError) -> Self {
        if err.is_not_found() {
            CompatError::NotFound
        } else {
            CompatError::Upstream(err.to_string())
        }
    }
}
