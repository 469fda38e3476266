//! Get-blob response shape.

use serde::{Deserialize, Serialize};

use crate::base64_content;
use crate::error::{CompatError, Result};
use crate::urls::UrlContext;

/// `GET /api/repos/:owner/:repo/git/blobs/:sha`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobResponse {
    pub sha: String,
    pub size: u64,
    pub url: String,
    /// Base64 of the blob bytes with a trailing newline.
    pub content: String,
    pub encoding: String,
}

impl BlobResponse {
    pub fn new(urls: &UrlContext, owner: &str, repo: &str, sha: &str, bytes: &[u8]) -> Self {
        Self {
            sha: sha.to_string(),
            size: bytes.len() as u64,
            url: urls.blob_api(owner, repo, sha),
            content: base64_content(bytes),
            encoding: "base64".to_string(),
        }
    }
}

/// Validates the `:sha` route parameter: exactly 40 lowercase hex
/// characters, nothing shorter, nothing mixed-case.
pub fn validate_blob_sha(sha: &str) -> Result<()> {
    if fauxhub_git::is_full_sha(sha) {
        Ok(())
    } else {
        Err(CompatError::InvalidSha)
    }
}
