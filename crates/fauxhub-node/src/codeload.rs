//! Archive downloads, `codeload.github.com`-style.

use std::io::Write;
use std::path::Path as FsPath;

use axum::body::Body;
use axum::extract::{Extension, Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use fauxhub_compat::{
    archive_file_name, create_archive, ArchiveEntry, ArchiveFormat,
};
use fauxhub_git::{
    collect_tree_entries, read_blob, resolve_commit, GitAccessError, ObjectType, Repo,
};

use crate::api::{redirect_found, url_context, AppState, ListenerScheme};
use crate::error::ApiError;
use crate::subdomain::SubdomainMapped;

/// `GET /codeload/:owner/:repo/:format/:ref` where format is one of
/// `zip`, `tar.gz`, `legacy.zip`, `legacy.tar.gz`.
pub async fn download(
    State(state): State<AppState>,
    Path((owner, repo_name, format, reference)): Path<(String, String, String, String)>,
) -> Result<Response, ApiError> {
    let format = ArchiveFormat::from_segment(&format).ok_or(ApiError::NotFound)?;
    serve_archive(&state, &owner, &repo_name, format, &reference).await
}

/// `GET /:owner/:repo/archive/:ref.zip` and `:ref.tar.gz`: a 302 to the
/// codeload download, GitHub's HTML-surface archive link.
pub async fn archive_redirect(
    State(state): State<AppState>,
    Extension(scheme): Extension<ListenerScheme>,
    mapped: Option<Extension<SubdomainMapped>>,
    headers: HeaderMap,
    Path((owner, repo_name, refext)): Path<(String, String, String)>,
) -> Result<Response, ApiError> {
    let (reference, format) = if let Some(r) = refext.strip_suffix(".zip") {
        (r, ArchiveFormat::Zip)
    } else if let Some(r) = refext.strip_suffix(".tar.gz") {
        (r, ArchiveFormat::TarGz)
    } else {
        return Err(ApiError::NotFound);
    };

    let urls = url_context(&state, scheme, mapped.is_some(), &headers);
    Ok(redirect_found(urls.codeload(
        &owner,
        &repo_name,
        format.segment(),
        reference,
    )))
}

async fn serve_archive(
    state: &AppState,
    owner: &str,
    repo_name: &str,
    format: ArchiveFormat,
    reference: &str,
) -> Result<Response, ApiError> {
    let repo = state.open_repo(owner, repo_name)?;
    let serve_uncommitted = repo.is_checked_out(reference);
    let commit = resolve_commit(&repo, reference)?;

    let commit_hex = commit.to_string();
    let name = archive_file_name(
        owner,
        repo_name,
        (!serve_uncommitted).then_some(commit_hex.as_str()),
        format,
    );
    let cache_path = state.archive_cache_dir.join(&name);

    let bytes = if !serve_uncommitted && cache_path.is_file() {
        tokio::fs::read(&cache_path)
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?
    } else {
        let entries = if serve_uncommitted {
            work_tree_entries(&repo)?
        } else {
            committed_entries(&repo, commit)?
        };
        let bytes = create_archive(format, String::new(), entries)?;

        // Cache committed archives only; a snapshot of a dirty work tree
        // is stale the moment it is produced. Write through a unique temp
        // file and rename so readers never observe a partial archive.
        if !serve_uncommitted {
            if let Err(e) = write_cache_atomically(&state.archive_cache_dir, &cache_path, &bytes) {
                tracing::warn!(file = %cache_path.display(), error = %e, "archive cache write failed");
            }
        }
        bytes
    };

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={name}"),
            ),
        ],
        Body::from(bytes),
    )
        .into_response())
}

fn write_cache_atomically(dir: &FsPath, target: &FsPath, bytes: &[u8]) -> std::io::Result<()> {
    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(bytes)?;
    temp.flush()?;
    // Concurrent writers race benignly; the last rename wins.
    temp.persist(target).map_err(|e| e.error)?;
    Ok(())
}

/// Entries for a committed archive: the commit's tree, depth-first, with
/// explicit directory records for trees and submodules.
fn committed_entries(repo: &Repo, commit: fauxhub_git::Oid) -> Result<Vec<ArchiveEntry>, ApiError> {
    let commit_obj = repo
        .raw()
        .find_commit(commit)
        .map_err(GitAccessError::from)?;
    let flat = collect_tree_entries(repo, commit_obj.tree_id(), "", true)?;

    let mut entries = Vec::with_capacity(flat.len());
    for entry in flat {
        match entry.kind {
            ObjectType::Tree | ObjectType::Commit => entries.push(ArchiveEntry::dir(entry.path)),
            ObjectType::Blob => {
                let content = read_blob(repo, entry.oid)?;
                let mode = if entry.mode == 0o100755 { 0o755 } else { 0o644 };
                entries.push(ArchiveEntry::file_with_mode(entry.path, content, mode));
            }
            _ => {}
        }
    }
    Ok(entries)
}

/// Entries for an uncommitted snapshot: the working directory, honoring
/// the repository's gitignore rules and always excluding `.git/`.
fn work_tree_entries(repo: &Repo) -> Result<Vec<ArchiveEntry>, ApiError> {
    let root = repo
        .workdir()
        .ok_or_else(|| ApiError::Internal("work-tree archive of a bare repository".to_string()))?
        .to_path_buf();

    let mut entries = Vec::new();
    walk_dir(repo, &root, &root, &mut entries)?;
    Ok(entries)
}

fn walk_dir(
    repo: &Repo,
    root: &FsPath,
    dir: &FsPath,
    entries: &mut Vec<ArchiveEntry>,
) -> Result<(), ApiError> {
    let mut children: Vec<_> = std::fs::read_dir(dir)
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .filter_map(|e| e.ok())
        .collect();
    children.sort_by_key(|e| e.file_name());

    for child in children {
        let path = child.path();
        if child.file_name() == ".git" {
            continue;
        }
        let rel = match path.strip_prefix(root) {
            Ok(rel) => rel.to_path_buf(),
            Err(_) => continue,
        };
        if repo.raw().is_path_ignored(&rel).unwrap_or(false) {
            continue;
        }
        let rel_str = rel.to_string_lossy().replace('\\', "/");

        let file_type = match child.file_type() {
            Ok(t) => t,
            Err(_) => continue,
        };
        if file_type.is_dir() {
            entries.push(ArchiveEntry::dir(rel_str));
            walk_dir(repo, root, &path, entries)?;
        } else {
            let content = match std::fs::read(&path) {
                Ok(content) => content,
                // Racing an external writer; skip what vanished.
                Err(_) => continue,
            };
            let mode = file_mode(&path);
            entries.push(ArchiveEntry::file_with_mode(rel_str, content, mode));
        }
    }
    Ok(())
}

#[cfg(unix)]
fn file_mode(path: &FsPath) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    match std::fs::metadata(path) {
        Ok(meta) if meta.permissions().mode() & 0o111 != 0 => 0o755,
        _ => 0o644,
    }
}

#[cfg(not(unix))]
fn file_mode(_path: &FsPath) -> u32 {
    0o644
}
