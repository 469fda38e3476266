//! Raw blob delivery, `raw.githubusercontent.com`-style.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use fauxhub_git::{raw_content, resolve_blob, split_ref_path, Repo};

use crate::api::{AppState, RawRequestInfo};
use crate::mime::content_type_for;

/// `GET /raw/:owner/:repo/:ref/*path`
pub async fn raw_prefixed(
    State(state): State<AppState>,
    Path((owner, repo, refpath)): Path<(String, String, String)>,
    uri: Uri,
) -> Response {
    serve_raw(&state, &owner, &repo, &refpath, &uri)
}

/// `GET /:owner/:repo/raw/:ref/*path`
pub async fn raw_infixed(
    State(state): State<AppState>,
    Path((owner, repo, refpath)): Path<(String, String, String)>,
    uri: Uri,
) -> Response {
    serve_raw(&state, &owner, &repo, &refpath, &uri)
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "not found.").into_response()
}

fn serve_raw(state: &AppState, owner: &str, repo_name: &str, refpath: &str, uri: &Uri) -> Response {
    let repo_path = state.resolver.resolve(owner, repo_name);
    let repo = match Repo::open(&repo_path) {
        Ok(repo) => repo,
        Err(_) => return not_found(),
    };

    let split = match split_ref_path(&repo, refpath) {
        Ok(split) => split,
        Err(_) => return not_found(),
    };
    let reference = split.reference().to_string();
    let file_path = fauxhub_git::normalize_path(split.path());

    notify_observer(state, &repo_path, &file_path, &reference, uri);

    let include_uncommitted = repo.is_checked_out(&reference);
    let blob = match resolve_blob(&repo, &reference, &file_path, include_uncommitted) {
        Ok(blob) => blob,
        Err(_) => return not_found(),
    };
    let bytes = match raw_content(&repo, &blob) {
        Ok(bytes) => bytes,
        Err(_) => return not_found(),
    };

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type_for(&file_path)),
            (header::CACHE_CONTROL, "max-age=0, private, must-revalidate"),
        ],
        [(header::ETAG, blob.oid.to_string())],
        Body::from(bytes),
    )
        .into_response()
}

/// Invokes the configured raw-request observer, if any. A panicking
/// observer is logged and swallowed; observation never breaks delivery.
fn notify_observer(
    state: &AppState,
    repo_path: &std::path::Path,
    file_path: &str,
    reference: &str,
    uri: &Uri,
) {
    let Some(observer) = &state.raw_observer else {
        return;
    };
    let info = RawRequestInfo {
        repo_path,
        file_path,
        reference,
        uri,
    };
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| observer(info)));
    if result.is_err() {
        tracing::warn!(uri = %uri, "raw request observer panicked");
    }
}
