//! Commit history enumeration.

use std::path::Path;

use git2::{Oid, Sort};

use crate::error::Result;
use crate::objects::normalize_path;
use crate::refs::resolve_commit;
use crate::repo::Repo;

/// Author or committer identity with its timestamp (UNIX seconds).
#[derive(Debug, Clone)]
pub struct SignatureInfo {
    pub name: String,
    pub email: String,
    pub seconds: i64,
}

/// A commit flattened for encoding, detached from libgit2 lifetimes.
#[derive(Debug, Clone)]
pub struct CommitInfo {
    pub id: Oid,
    pub tree_id: Oid,
    pub parent_ids: Vec<Oid>,
    pub author: SignatureInfo,
    pub committer: SignatureInfo,
    pub message: String,
}

fn signature_info(sig: &git2::Signature<'_>) -> SignatureInfo {
    SignatureInfo {
        name: String::from_utf8_lossy(sig.name_bytes()).into_owned(),
        email: String::from_utf8_lossy(sig.email_bytes()).into_owned(),
        seconds: sig.when().seconds(),
    }
}

fn commit_info(commit: &git2::Commit<'_>) -> CommitInfo {
    CommitInfo {
        id: commit.id(),
        tree_id: commit.tree_id(),
        parent_ids: commit.parent_ids().collect(),
        author: signature_info(&commit.author()),
        committer: signature_info(&commit.committer()),
        message: String::from_utf8_lossy(commit.message_bytes()).into_owned(),
    }
}

/// Blob id at `path` in a commit's tree, if the path names a file there.
fn blob_at(commit: &git2::Commit<'_>, path: &str) -> Option<Oid> {
    let tree = commit.tree().ok()?;
    let entry = tree.get_path(Path::new(path)).ok()?;
    match entry.kind() {
        Some(git2::ObjectType::Blob) => Some(entry.id()),
        _ => None,
    }
}

/// Commits reachable from `ref_or_sha`, newest first.
///
/// With `path`, only commits where the blob at `path` differs from the
/// chronologically previous commit are kept; the commit introducing the
/// path is included, and the walk stops once the path disappears going
/// back in history.
pub fn commit_log(repo: &Repo, ref_or_sha: &str, path: Option<&str>) -> Result<Vec<CommitInfo>> {
    let start = resolve_commit(repo, ref_or_sha)?;

    let mut walk = repo.raw().revwalk()?;
    walk.set_sorting(Sort::TIME)?;
    walk.push(start)?;

    let mut commits = Vec::new();
    for oid in walk {
        let oid = oid?;
        commits.push(repo.raw().find_commit(oid)?);
    }

    let path = path.map(normalize_path).filter(|p| !p.is_empty());
    let Some(path) = path else {
        return Ok(commits.iter().map(commit_info).collect());
    };

    let mut out = Vec::new();
    for (i, commit) in commits.iter().enumerate() {
        let Some(current) = blob_at(commit, &path) else {
            // The path does not exist this far back; nothing older can
            // have touched it either.
            break;
        };
        let previous = commits.get(i + 1).and_then(|c| blob_at(c, &path));
        match previous {
            None => out.push(commit_info(commit)),
            Some(prev) if prev != current => out.push(commit_info(commit)),
            Some(_) => {}
        }
    }
    Ok(out)
}
