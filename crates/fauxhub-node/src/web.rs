//! HTML stub pages for GitHub's browse URLs.
//!
//! The browse surface is deliberately a placeholder: the routes resolve
//! refs and paths like the real endpoints do (so status codes are
//! faithful) but render a static page instead of a file browser.

use askama::Template;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use fauxhub_git::{resolve_blob, resolve_commit, resolve_object, split_ref_path, ObjectType, Repo};

use crate::api::AppState;

#[derive(Template)]
#[template(
    source = "<!DOCTYPE html>
<html>
<head><title>{{ title }}</title></head>
<body>
<h1>{{ owner }}/{{ repo }}</h1>
<p>Repository browsing is not implemented on this server. Clone it instead:</p>
<pre>git clone /{{ owner }}/{{ repo }}.git</pre>
</body>
</html>",
    ext = "html"
)]
struct RepoTemplate {
    title: String,
    owner: String,
    repo: String,
}

#[derive(Template)]
#[template(
    source = "<!DOCTYPE html>
<html>
<head><title>{{ title }}</title></head>
<body>
<h1>{{ owner }}/{{ repo }}</h1>
<p>{{ kind }} view of <code>{{ path }}</code> at <code>{{ reference }}</code> is not implemented on this server.</p>
</body>
</html>",
    ext = "html"
)]
struct ObjectTemplate {
    title: String,
    owner: String,
    repo: String,
    reference: String,
    path: String,
    kind: &'static str,
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "not found.").into_response()
}

/// `GET /:owner/:repo`
pub async fn repo_page(
    State(state): State<AppState>,
    Path((owner, repo)): Path<(String, String)>,
) -> Response {
    render_repo_page(&state, &owner, &repo)
}

/// `GET /:owner/:repo/*rest` — anything under a repository that is not a
/// more specific route.
pub async fn repo_page_any(
    State(state): State<AppState>,
    Path((owner, repo, _rest)): Path<(String, String, String)>,
) -> Response {
    render_repo_page(&state, &owner, &repo)
}

fn render_repo_page(state: &AppState, owner: &str, repo: &str) -> Response {
    if Repo::open(state.resolver.resolve(owner, repo)).is_err() {
        return not_found();
    }
    let template = RepoTemplate {
        title: state.config.app_title.clone(),
        owner: owner.to_string(),
        repo: repo.to_string(),
    };
    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// `GET /:owner/:repo/blob/:ref/*path`
pub async fn blob_page(
    State(state): State<AppState>,
    Path((owner, repo_name, refpath)): Path<(String, String, String)>,
) -> Response {
    object_page(&state, &owner, &repo_name, &refpath, "Blob")
}

/// `GET /:owner/:repo/tree/:ref/*path`
pub async fn tree_page(
    State(state): State<AppState>,
    Path((owner, repo_name, refpath)): Path<(String, String, String)>,
) -> Response {
    object_page(&state, &owner, &repo_name, &refpath, "Tree")
}

fn object_page(
    state: &AppState,
    owner: &str,
    repo_name: &str,
    refpath: &str,
    kind: &'static str,
) -> Response {
    let Ok(repo) = Repo::open(state.resolver.resolve(owner, repo_name)) else {
        return not_found();
    };
    let Ok(split) = split_ref_path(&repo, refpath) else {
        return not_found();
    };
    let reference = split.reference().to_string();
    let path = fauxhub_git::normalize_path(split.path());

    let resolved = match kind {
        "Blob" => {
            let include_uncommitted = repo.is_checked_out(&reference);
            resolve_blob(&repo, &reference, &path, include_uncommitted).is_ok()
        }
        _ => resolve_commit(&repo, &reference)
            .and_then(|commit| resolve_object(&repo, commit, &path))
            .map(|obj| obj.kind == ObjectType::Tree)
            .unwrap_or(false),
    };
    if !resolved {
        return not_found();
    }

    let template = ObjectTemplate {
        title: state.config.app_title.clone(),
        owner: owner.to_string(),
        repo: repo_name.to_string(),
        reference,
        path,
        kind,
    };
    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}
