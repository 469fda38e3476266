//! Maps `owner/repo` pairs to filesystem paths.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A configured virtual repository: a logical `owner/repo` mounted at an
/// arbitrary filesystem path, taken verbatim and trusted.
#[derive(Debug, Clone)]
pub struct VirtualRepo {
    /// Absolute path of the repository on disk.
    pub path: PathBuf,
}

/// Resolves `(owner, repo)` to an on-disk location.
///
/// Virtual repositories win over the default layout. Everything else lands
/// under `repo_root/<owner>/<repo>` with both segments sanitized so that no
/// request can escape the root. Existence is not checked here; missing
/// directories surface as NotFound when the repository is opened.
#[derive(Debug, Clone)]
pub struct RepoResolver {
    repo_root: PathBuf,
    virtual_repos: HashMap<String, HashMap<String, VirtualRepo>>,
}

impl RepoResolver {
    /// Creates a resolver rooted at `repo_root`.
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
            virtual_repos: HashMap::new(),
        }
    }

    /// Registers a virtual repository mount.
    pub fn add_virtual(&mut self, owner: &str, repo: &str, path: impl Into<PathBuf>) {
        self.virtual_repos
            .entry(owner.to_string())
            .or_default()
            .insert(repo.to_string(), VirtualRepo { path: path.into() });
    }

    /// The configured repository root.
    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    /// Resolves `(owner, repo)` to a filesystem path.
    pub fn resolve(&self, owner: &str, repo: &str) -> PathBuf {
        if let Some(v) = self
            .virtual_repos
            .get(owner)
            .and_then(|repos| repos.get(repo))
        {
            return v.path.clone();
        }

        self.repo_root
            .join(sanitize_segment(owner))
            .join(sanitize_segment(repo))
    }
}

/// Coerces a path segment into something safe to join under the root.
///
/// Every character outside `[A-Za-z0-9_.-]` becomes `-`, and the exact
/// strings `.` and `..` become same-length runs of `-` so they cannot act
/// as directory navigation.
fn sanitize_segment(segment: &str) -> String {
    match segment {
        "." => return "-".to_string(),
        ".." => return "--".to_string(),
        _ => {}
    }

    segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect()
}
