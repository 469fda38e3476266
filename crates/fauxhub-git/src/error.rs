//! Error types for Git access.

use thiserror::Error;

/// Result type for Git access operations.
pub type Result<T> = std::result::Result<T, GitAccessError>;

/// Errors that can occur while resolving refs and reading objects.
#[derive(Debug, Error)]
pub enum GitAccessError {
    /// The repository, ref, object, or path does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A ref or SHA resolved to an object of the wrong type.
    #[error("invalid ref: {0}")]
    InvalidRef(String),

    /// Underlying libgit2 failure.
    #[error("git error: {0}")]
    Git(git2::Error),

    /// Filesystem failure outside the object database.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<git2::Error> for GitAccessError {
    fn from(err: git2::Error) -> Self {
        // NotFound and ambiguous-prefix both surface as NotFound: an
        // ambiguous shortened oid must never resolve to a guess.
        match err.code() {
            git2::ErrorCode::NotFound | git2::ErrorCode::Ambiguous => {
                GitAccessError::NotFound(err.message().to_string())
            }
            _ => GitAccessError::Git(err),
        }
    }
}

impl GitAccessError {
    /// True when the error is any flavor of "does not exist".
    pub fn is_not_found(&self) -> bool {
        matches!(self, GitAccessError::NotFound(_))
    }
}
