//! Application state, router construction, and the GitHub-shaped JSON API.

use std::collections::HashMap;
use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Extension, Path, Query, RawQuery, State};
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use fauxhub_compat::{
    recursive_requested, validate_blob_sha, BlobResponse, CommitListItem, ContentEntry,
    ContentsQuery, TreeResponse, UrlContext,
};
use fauxhub_git::{
    collect_tree_entries, read_blob, resolve_commit, resolve_object, resolve_tree_oid, ObjectType,
    Oid, Repo, RepoResolver,
};
use tower::Layer;
use tower_http::trace::TraceLayer;

use crate::config::NodeConfig;
use crate::error::ApiError;
use crate::subdomain::SubdomainMapped;
use crate::{codeload, git_http, raw, web};

/// Which listener a request came in on; used when composing absolute URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerScheme {
    Http,
    Https,
}

impl ListenerScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListenerScheme::Http => "http",
            ListenerScheme::Https => "https",
        }
    }
}

/// Details handed to the optional raw-request observer.
pub struct RawRequestInfo<'a> {
    pub repo_path: &'a FsPath,
    pub file_path: &'a str,
    pub reference: &'a str,
    pub uri: &'a Uri,
}

/// Callback invoked on every raw-content request. Panics are caught and
/// logged so observation can never break delivery.
pub type RawObserver = Arc<dyn Fn(RawRequestInfo<'_>) + Send + Sync>;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<NodeConfig>,
    pub resolver: Arc<RepoResolver>,
    /// Directory holding finished archive files, keyed by
    /// `owner-repo-<commit>.<ext>`.
    pub archive_cache_dir: PathBuf,
    pub raw_observer: Option<RawObserver>,
}

impl AppState {
    /// Builds state from configuration, creating the archive cache dir.
    pub fn from_config(config: NodeConfig, raw_observer: Option<RawObserver>) -> std::io::Result<Self> {
        let resolver = Arc::new(config.build_resolver());
        let archive_cache_dir = std::env::temp_dir().join("fauxhub-archive-cache");
        std::fs::create_dir_all(&archive_cache_dir)?;
        Ok(Self {
            config: Arc::new(config),
            resolver,
            archive_cache_dir,
            raw_observer,
        })
    }

    /// Opens the repository for `(owner, repo)`.
    pub fn open_repo(&self, owner: &str, repo: &str) -> Result<Repo, ApiError> {
        Ok(Repo::open(self.resolver.resolve(owner, repo))?)
    }
}

/// Scheme and authority for self-referential URLs.
///
/// Requests that arrived through subdomain mapping advertise
/// `localhost:<configured-port>` instead of the external host so the
/// emitted URLs stay resolvable for plain clients.
pub fn url_context(
    state: &AppState,
    scheme: ListenerScheme,
    mapped: bool,
    headers: &HeaderMap,
) -> UrlContext {
    let authority = if mapped {
        let port = match scheme {
            ListenerScheme::Http => state.config.listen.http.port,
            ListenerScheme::Https => state
                .config
                .listen
                .https
                .as_ref()
                .map(|h| h.port)
                .unwrap_or(state.config.listen.http.port),
        };
        format!("localhost:{port}")
    } else {
        headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("localhost")
            .to_string()
    };
    UrlContext::new(scheme.as_str(), authority)
}

/// Creates the complete service for one listener: the routed application
/// wrapped in the subdomain rewrite.
///
/// The rewrite must run before route matching, so it cannot be added with
/// `Router::layer` (those layers run after routing). Instead the wrapped
/// service becomes the fallback of an otherwise-empty outer router, which
/// keeps the composed type a plain `Router` for both plain and TLS
/// listeners.
pub fn create_app(state: AppState, scheme: ListenerScheme) -> Router {
    let inner = create_router(state.clone(), scheme);
    let rewritten =
        axum::middleware::from_fn_with_state(state, crate::subdomain::rewrite_request).layer(inner);
    Router::new().fallback_service(rewritten)
}

/// Creates the router for one listener.
///
/// The subdomain rewrite runs outside this router (it has to see requests
/// before route matching); see [`crate::subdomain::rewrite_request`].
pub fn create_router(state: AppState, scheme: ListenerScheme) -> Router {
    Router::new()
        // Raw content
        .route("/raw/{owner}/{repo}/{*refpath}", get(raw::raw_prefixed))
        .route("/{owner}/{repo}/raw/{*refpath}", get(raw::raw_infixed))
        // Smart HTTP transport
        .route("/{owner}/{repo}/info/refs", get(git_http::info_refs))
        .route(
            "/{owner}/{repo}/git-upload-pack",
            post(git_http::upload_pack),
        )
        .route(
            "/{owner}/{repo}/git-receive-pack",
            post(git_http::receive_pack),
        )
        // Object APIs
        .route("/api/repos/{owner}/{repo}/git/blobs/{sha}", get(get_blob))
        .route("/api/repos/{owner}/{repo}/git/trees/{*refsha}", get(get_tree))
        .route("/api/repos/{owner}/{repo}/contents", get(get_contents_root))
        .route(
            "/api/repos/{owner}/{repo}/contents/{*path}",
            get(get_contents),
        )
        .route("/api/repos/{owner}/{repo}/commits", get(list_commits))
        // Archive links
        .route("/api/repos/{owner}/{repo}/zipball", get(zipball_default))
        .route("/api/repos/{owner}/{repo}/zipball/{*reference}", get(zipball))
        .route("/api/repos/{owner}/{repo}/tarball", get(tarball_default))
        .route("/api/repos/{owner}/{repo}/tarball/{*reference}", get(tarball))
        .route(
            "/{owner}/{repo}/archive/{*refext}",
            get(codeload::archive_redirect),
        )
        // Archive downloads
        .route(
            "/codeload/{owner}/{repo}/{format}/{*reference}",
            get(codeload::download),
        )
        // HTML stubs
        .route("/{owner}/{repo}/blob/{*refpath}", get(web::blob_page))
        .route("/{owner}/{repo}/tree/{*refpath}", get(web::tree_page))
        .route("/{owner}/{repo}", get(web::repo_page))
        .route("/{owner}/{repo}/{*rest}", get(web::repo_page_any))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(scheme))
        .with_state(state)
}

// ==================== Object API handlers ====================

/// `GET /api/repos/:owner/:repo/git/blobs/:sha`
async fn get_blob(
    State(state): State<AppState>,
    Extension(scheme): Extension<ListenerScheme>,
    mapped: Option<Extension<SubdomainMapped>>,
    headers: HeaderMap,
    Path((owner, repo_name, sha)): Path<(String, String, String)>,
) -> Result<Response, ApiError> {
    validate_blob_sha(&sha)?;
    let repo = state.open_repo(&owner, &repo_name)?;
    let oid = Oid::from_str(&sha).map_err(|_| ApiError::InvalidSha)?;
    let bytes = read_blob(&repo, oid)?;

    let urls = url_context(&state, scheme, mapped.is_some(), &headers);
    let body = BlobResponse::new(&urls, &owner, &repo_name, &sha, &bytes);
    Ok(Json(body).into_response())
}

/// `GET /api/repos/:owner/:repo/git/trees/:refOrSha?recursive=1`
async fn get_tree(
    State(state): State<AppState>,
    Extension(scheme): Extension<ListenerScheme>,
    mapped: Option<Extension<SubdomainMapped>>,
    headers: HeaderMap,
    Path((owner, repo_name, refsha)): Path<(String, String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    let repo = state.open_repo(&owner, &repo_name)?;
    // A blob SHA handed to the trees endpoint is a type error, but GitHub
    // reports unknown and mistyped ids the same way.
    let tree_oid = resolve_tree_oid(&repo, &refsha).map_err(|_| ApiError::NotFound)?;

    let deep = recursive_requested(params.get("recursive").map(String::as_str));
    let entries = collect_tree_entries(&repo, tree_oid, "", deep)?;

    let urls = url_context(&state, scheme, mapped.is_some(), &headers);
    let body = TreeResponse::new(&urls, &owner, &repo_name, &tree_oid.to_string(), &entries);
    Ok(Json(body).into_response())
}

/// `GET /api/repos/:owner/:repo/contents` (repository root)
async fn get_contents_root(
    state: State<AppState>,
    scheme: Extension<ListenerScheme>,
    mapped: Option<Extension<SubdomainMapped>>,
    headers: HeaderMap,
    Path((owner, repo_name)): Path<(String, String)>,
    query: Query<ContentsQuery>,
) -> Result<Response, ApiError> {
    contents_response(state, scheme, mapped, headers, owner, repo_name, String::new(), query).await
}

/// `GET /api/repos/:owner/:repo/contents/*path?ref=…`
async fn get_contents(
    state: State<AppState>,
    scheme: Extension<ListenerScheme>,
    mapped: Option<Extension<SubdomainMapped>>,
    headers: HeaderMap,
    Path((owner, repo_name, path)): Path<(String, String, String)>,
    query: Query<ContentsQuery>,
) -> Result<Response, ApiError> {
    contents_response(state, scheme, mapped, headers, owner, repo_name, path, query).await
}

#[allow(clippy::too_many_arguments)]
async fn contents_response(
    State(state): State<AppState>,
    Extension(scheme): Extension<ListenerScheme>,
    mapped: Option<Extension<SubdomainMapped>>,
    headers: HeaderMap,
    owner: String,
    repo_name: String,
    path: String,
    Query(query): Query<ContentsQuery>,
) -> Result<Response, ApiError> {
    let repo = state
        .open_repo(&owner, &repo_name)
        .map_err(|_| ApiError::NoCommitForRef(query.git_ref.clone().unwrap_or_default()))?;

    let reference = match query.git_ref {
        Some(ref r) if !r.is_empty() => r.clone(),
        _ => repo
            .default_branch()
            .map_err(|_| ApiError::NoCommitForRef(String::new()))?,
    };

    let not_found = || ApiError::NoCommitForRef(reference.clone());

    let commit = resolve_commit(&repo, &reference).map_err(|_| not_found())?;
    let path = fauxhub_git::normalize_path(path.trim_start_matches('/'));
    let object = resolve_object(&repo, commit, &path).map_err(|_| not_found())?;

    let urls = url_context(&state, scheme, mapped.is_some(), &headers);

    match object.kind {
        ObjectType::Blob => {
            let bytes = read_blob(&repo, object.oid)?;
            let entry = ContentEntry::file(
                &urls,
                &owner,
                &repo_name,
                &reference,
                &path,
                &object.oid.to_string(),
                bytes.len() as u64,
            )
            .with_content(&bytes);
            Ok(Json(entry).into_response())
        }
        _ => {
            let entries = collect_tree_entries(&repo, object.oid, &path, false)?;
            let listing: Vec<ContentEntry> = entries
                .iter()
                .map(|entry| {
                    let sha = entry.oid.to_string();
                    match entry.kind {
                        ObjectType::Blob => ContentEntry::file(
                            &urls,
                            &owner,
                            &repo_name,
                            &reference,
                            &entry.path,
                            &sha,
                            entry.size.unwrap_or(0),
                        ),
                        _ => ContentEntry::dir(
                            &urls,
                            &owner,
                            &repo_name,
                            &reference,
                            &entry.path,
                            &sha,
                        ),
                    }
                })
                .collect();
            Ok(Json(listing).into_response())
        }
    }
}

/// `GET /api/repos/:owner/:repo/commits?sha=&path=`
async fn list_commits(
    State(state): State<AppState>,
    Extension(scheme): Extension<ListenerScheme>,
    mapped: Option<Extension<SubdomainMapped>>,
    headers: HeaderMap,
    Path((owner, repo_name)): Path<(String, String)>,
    RawQuery(raw_query): RawQuery,
) -> Result<Response, ApiError> {
    let pairs: Vec<(String, String)> = match raw_query.as_deref() {
        Some(q) => serde_urlencoded::from_str(q)
            .map_err(|e| ApiError::BadRequest(format!("malformed query: {e}")))?,
        None => Vec::new(),
    };

    // A repeated `path` parameter is the axum-visible shape of "path is
    // not a string".
    let paths: Vec<&str> = pairs
        .iter()
        .filter(|(k, _)| k == "path")
        .map(|(_, v)| v.as_str())
        .collect();
    if paths.len() > 1 {
        return Err(ApiError::BadRequest("path given more than once".to_string()));
    }

    let repo = state.open_repo(&owner, &repo_name)?;

    let sha = pairs
        .iter()
        .find(|(k, v)| k == "sha" && !v.is_empty())
        .map(|(_, v)| v.clone());
    let sha = match sha {
        Some(s) => s,
        None => repo.default_branch()?,
    };

    let path = paths
        .first()
        .map(|p| p.trim_start_matches('/'))
        .filter(|p| !p.is_empty());

    let log = fauxhub_git::commit_log(&repo, &sha, path)?;

    let urls = url_context(&state, scheme, mapped.is_some(), &headers);
    let body: Vec<CommitListItem> = log
        .iter()
        .map(|info| CommitListItem::new(&urls, &owner, &repo_name, info))
        .collect();
    Ok(Json(body).into_response())
}

// ==================== Archive link handlers ====================

pub(crate) fn redirect_found(location: String) -> Response {
    Response::builder()
        .status(StatusCode::FOUND)
        .header(header::LOCATION, location)
        .body(Body::empty())
        .unwrap()
}

#[allow(clippy::too_many_arguments)]
async fn archive_link(
    state: &AppState,
    scheme: ListenerScheme,
    mapped: bool,
    headers: &HeaderMap,
    owner: &str,
    repo_name: &str,
    format_segment: &str,
    reference: Option<String>,
) -> Result<Response, ApiError> {
    let reference = match reference {
        Some(r) if !r.is_empty() => r,
        _ => state.open_repo(owner, repo_name)?.default_branch()?,
    };
    let urls = url_context(state, scheme, mapped, headers);
    Ok(redirect_found(urls.codeload(
        owner,
        repo_name,
        format_segment,
        &reference,
    )))
}

async fn zipball_default(
    State(state): State<AppState>,
    Extension(scheme): Extension<ListenerScheme>,
    mapped: Option<Extension<SubdomainMapped>>,
    headers: HeaderMap,
    Path((owner, repo_name)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    archive_link(&state, scheme, mapped.is_some(), &headers, &owner, &repo_name, "zip", None).await
}

async fn zipball(
    State(state): State<AppState>,
    Extension(scheme): Extension<ListenerScheme>,
    mapped: Option<Extension<SubdomainMapped>>,
    headers: HeaderMap,
    Path((owner, repo_name, reference)): Path<(String, String, String)>,
) -> Result<Response, ApiError> {
    archive_link(
        &state,
        scheme,
        mapped.is_some(),
        &headers,
        &owner,
        &repo_name,
        "zip",
        Some(reference),
    )
    .await
}

async fn tarball_default(
    State(state): State<AppState>,
    Extension(scheme): Extension<ListenerScheme>,
    mapped: Option<Extension<SubdomainMapped>>,
    headers: HeaderMap,
    Path((owner, repo_name)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    archive_link(
        &state,
        scheme,
        mapped.is_some(),
        &headers,
        &owner,
        &repo_name,
        "tar.gz",
        None,
    )
    .await
}

async fn tarball(
    State(state): State<AppState>,
    Extension(scheme): Extension<ListenerScheme>,
    mapped: Option<Extension<SubdomainMapped>>,
    headers: HeaderMap,
    Path((owner, repo_name, reference)): Path<(String, String, String)>,
) -> Result<Response, ApiError> {
    archive_link(
        &state,
        scheme,
        mapped.is_some(),
        &headers,
        &owner,
        &repo_name,
        "tar.gz",
        Some(reference),
    )
    .await
}
