//! Object reads and the committed-vs-working-tree decision.

use std::io::Read;
use std::path::{Path, PathBuf};

use flate2::read::ZlibDecoder;
use git2::{ObjectType, Oid, Status};

use crate::error::{GitAccessError, Result};
use crate::refs::resolve_commit;
use crate::repo::Repo;

/// Working tree state of a single path, mirroring Git's status classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkTreeStatus {
    Unmodified,
    Modified,
    Added,
    Deleted,
    Ignored,
    Absent,
}

/// A blob resolved for delivery.
#[derive(Debug, Clone)]
pub struct ResolvedBlob {
    /// The blob id (for work-tree content, the id its bytes would hash to).
    pub oid: Oid,
    /// Where the bytes come from.
    pub source: BlobSource,
}

/// Origin of a resolved blob's bytes.
#[derive(Debug, Clone)]
pub enum BlobSource {
    /// Read from the object database.
    Committed,
    /// Read from the working tree at this absolute path.
    WorkTree(PathBuf),
}

/// Object kind and id found by traversing a commit's tree.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedObject {
    pub kind: ObjectType,
    pub oid: Oid,
}

/// Collapses redundant and leading slashes: `sub//x` and `/sub/x` both mean
/// `sub/x`.
pub fn normalize_path(path: &str) -> String {
    path.split('/')
        .filter(|seg| !seg.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Status of `path` in the working tree.
pub fn work_tree_status(repo: &Repo, path: &str) -> Result<WorkTreeStatus> {
    let status = match repo.raw().status_file(Path::new(path)) {
        Ok(s) => s,
        Err(e) if e.code() == git2::ErrorCode::NotFound => return Ok(WorkTreeStatus::Absent),
        Err(e) => return Err(e.into()),
    };

    if status.is_empty() {
        Ok(WorkTreeStatus::Unmodified)
    } else if status.intersects(Status::WT_DELETED | Status::INDEX_DELETED) {
        Ok(WorkTreeStatus::Deleted)
    } else if status.intersects(Status::WT_NEW | Status::INDEX_NEW) {
        Ok(WorkTreeStatus::Added)
    } else if status.contains(Status::IGNORED) {
        Ok(WorkTreeStatus::Ignored)
    } else {
        Ok(WorkTreeStatus::Modified)
    }
}

/// The blob id at `path` in the tree of `commit_oid`.
pub fn blob_oid_in_commit(repo: &Repo, commit_oid: Oid, path: &str) -> Result<Oid> {
    let commit = repo.raw().find_commit(commit_oid)?;
    let tree = commit.tree()?;
    let entry = tree.get_path(Path::new(path))?;
    match entry.kind() {
        Some(ObjectType::Blob) => Ok(entry.id()),
        _ => Err(GitAccessError::NotFound(format!("{path} is not a file"))),
    }
}

/// Resolves the blob to serve for `(reference, path)`.
///
/// With `include_uncommitted` the per-path working tree status decides
/// between committed and on-disk content, per the status table:
/// unmodified serves the committed blob, deleted/absent are gone, added or
/// ignored entries whose file vanished are gone, and anything else hashes
/// the on-disk bytes with the `blob <len>\0` header. A failed status probe
/// (e.g. racing an external `git commit`) falls back to the committed blob.
pub fn resolve_blob(
    repo: &Repo,
    reference: &str,
    path: &str,
    include_uncommitted: bool,
) -> Result<ResolvedBlob> {
    let path = normalize_path(path);
    if path.is_empty() {
        return Err(GitAccessError::NotFound("empty path".into()));
    }

    let commit = resolve_commit(repo, reference)?;
    let committed = |repo: &Repo| -> Result<ResolvedBlob> {
        Ok(ResolvedBlob {
            oid: blob_oid_in_commit(repo, commit, &path)?,
            source: BlobSource::Committed,
        })
    };

    if !include_uncommitted {
        return committed(repo);
    }

    let status = match work_tree_status(repo, &path) {
        Ok(s) => s,
        Err(e) => {
            // Racing an external `git commit`; the committed object is
            // the safe answer.
            tracing::debug!(path = %path, error = %e, "status probe failed, serving committed blob");
            return committed(repo);
        }
    };

    match status {
        WorkTreeStatus::Unmodified => committed(repo),
        WorkTreeStatus::Deleted | WorkTreeStatus::Absent => {
            Err(GitAccessError::NotFound(format!("{path} is gone from the work tree")))
        }
        WorkTreeStatus::Added | WorkTreeStatus::Ignored | WorkTreeStatus::Modified => {
            let workdir = repo
                .workdir()
                .ok_or_else(|| GitAccessError::NotFound("bare repository".into()))?;
            let file = workdir.join(&path);
            if !file.is_file() {
                return Err(GitAccessError::NotFound(format!("{path} missing on disk")));
            }
            let bytes = std::fs::read(&file)?;
            let oid = Oid::hash_object(ObjectType::Blob, &bytes)?;
            Ok(ResolvedBlob {
                oid,
                source: BlobSource::WorkTree(file),
            })
        }
    }
}

/// Reads the bytes behind a resolved blob.
pub fn raw_content(repo: &Repo, blob: &ResolvedBlob) -> Result<Vec<u8>> {
    match &blob.source {
        BlobSource::Committed => read_blob(repo, blob.oid),
        BlobSource::WorkTree(file) => Ok(std::fs::read(file)?),
    }
}

/// Reads a committed blob, preferring the loose-object file on disk.
///
/// A loose object is zlib-compressed `blob <len>\0<bytes>`; when present it
/// is inflated directly, otherwise the odb serves the same bytes (e.g. for
/// packed objects).
pub fn read_blob(repo: &Repo, oid: Oid) -> Result<Vec<u8>> {
    if let Some(bytes) = read_loose_blob(repo, oid) {
        return Ok(bytes);
    }
    Ok(repo.raw().find_blob(oid)?.content().to_vec())
}

fn read_loose_blob(repo: &Repo, oid: Oid) -> Option<Vec<u8>> {
    let hex = oid.to_string();
    let path = repo
        .raw()
        .path()
        .join("objects")
        .join(&hex[..2])
        .join(&hex[2..]);
    let compressed = std::fs::read(path).ok()?;

    let mut raw = Vec::new();
    ZlibDecoder::new(compressed.as_slice())
        .read_to_end(&mut raw)
        .ok()?;

    let nul = raw.iter().position(|&b| b == 0)?;
    let header = std::str::from_utf8(&raw[..nul]).ok()?;
    if !header.starts_with("blob ") {
        return None;
    }
    Some(raw.split_off(nul + 1))
}

/// Raw object database access: kind and bytes for any oid.
pub fn object(repo: &Repo, oid: Oid) -> Result<(ObjectType, Vec<u8>)> {
    let odb = repo.raw().odb()?;
    let obj = odb.read(oid)?;
    Ok((obj.kind(), obj.data().to_vec()))
}

/// Size in bytes of the object behind `oid`, without loading its data.
pub fn object_size(repo: &Repo, oid: Oid) -> Result<u64> {
    let odb = repo.raw().odb()?;
    let (size, _) = odb.read_header(oid)?;
    Ok(size as u64)
}

/// Traverses the tree of `commit_oid` to the blob or tree at `path`.
///
/// An empty path resolves to the root tree itself.
pub fn resolve_object(repo: &Repo, commit_oid: Oid, path: &str) -> Result<ResolvedObject> {
    let commit = repo.raw().find_commit(commit_oid)?;
    let tree = commit.tree()?;
    let path = normalize_path(path);

    if path.is_empty() {
        return Ok(ResolvedObject {
            kind: ObjectType::Tree,
            oid: tree.id(),
        });
    }

    let entry = tree.get_path(Path::new(&path))?;
    match entry.kind() {
        Some(kind @ (ObjectType::Blob | ObjectType::Tree)) => Ok(ResolvedObject {
            kind,
            oid: entry.id(),
        }),
        _ => Err(GitAccessError::NotFound(format!(
            "{path} is neither a file nor a directory"
        ))),
    }
}

/// Resolves a ref or SHA to a tree id.
///
/// A full SHA may name a tree directly, a commit (its tree is taken), or an
/// annotated tag (chased to the object it wraps). Anything else resolves as
/// a ref / shortened SHA to a commit first.
pub fn resolve_tree_oid(repo: &Repo, ref_or_sha: &str) -> Result<Oid> {
    if crate::refs::is_full_sha(ref_or_sha) {
        let oid = Oid::from_str(ref_or_sha)?;
        let mut obj = repo.raw().find_object(oid, None)?;
        loop {
            match obj.kind() {
                Some(ObjectType::Tree) => return Ok(obj.id()),
                Some(ObjectType::Commit) => {
                    let commit = repo.raw().find_commit(obj.id())?;
                    return Ok(commit.tree_id());
                }
                Some(ObjectType::Tag) => {
                    let tag = repo.raw().find_tag(obj.id())?;
                    obj = tag.target()?;
                }
                _ => {
                    return Err(GitAccessError::InvalidRef(format!(
                        "{ref_or_sha} does not name a tree"
                    )))
                }
            }
        }
    }

    let commit_oid = resolve_commit(repo, ref_or_sha)?;
    let commit = repo.raw().find_commit(commit_oid)?;
    Ok(commit.tree_id())
}
