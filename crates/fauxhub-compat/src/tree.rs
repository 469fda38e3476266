//! Get-tree response shape.

use fauxhub_git::{FlatEntry, ObjectType};
use serde::{Deserialize, Serialize};

use crate::urls::UrlContext;

/// One entry of a tree listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeItem {
    pub path: String,
    /// Six-digit zero-padded octal filemode.
    pub mode: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub sha: String,
    /// Populated for blobs only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// `GET /api/repos/:owner/:repo/git/trees/:refOrSha`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeResponse {
    pub sha: String,
    pub url: String,
    pub tree: Vec<TreeItem>,
    pub truncated: bool,
}

impl TreeResponse {
    pub fn new(
        urls: &UrlContext,
        owner: &str,
        repo: &str,
        tree_sha: &str,
        entries: &[FlatEntry],
    ) -> Self {
        let tree = entries
            .iter()
            .map(|entry| {
                let sha = entry.oid.to_string();
                let (kind, url) = match entry.kind {
                    ObjectType::Tree => ("tree", Some(urls.tree_api(owner, repo, &sha))),
                    ObjectType::Commit => ("commit", None),
                    _ => ("blob", Some(urls.blob_api(owner, repo, &sha))),
                };
                TreeItem {
                    path: entry.path.clone(),
                    mode: format!("{:06o}", entry.mode),
                    kind: kind.to_string(),
                    sha,
                    size: entry.size,
                    url,
                }
            })
            .collect();

        Self {
            sha: tree_sha.to_string(),
            url: urls.tree_api(owner, repo, tree_sha),
            tree,
            truncated: false,
        }
    }
}

/// The `recursive` query parameter is active when present with any
/// non-empty value.
pub fn recursive_requested(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.is_empty())
}
