//! Shared fixtures for end-to-end tests.

#![allow(dead_code)]

use std::path::Path;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use fauxhub_node::api::{create_app, AppState, ListenerScheme};
use fauxhub_node::config::NodeConfig;
use git2::{Oid, Repository, RepositoryInitOptions, Signature};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

/// A repo root, an isolated archive cache, and app state wired to both.
pub struct TestContext {
    pub root: TempDir,
    pub cache: TempDir,
    pub state: AppState,
}

pub fn context() -> TestContext {
    context_with(|_| {})
}

/// Builds a context after letting the caller adjust the configuration.
pub fn context_with(adjust: impl FnOnce(&mut NodeConfig)) -> TestContext {
    let root = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();

    let mut config = NodeConfig::default();
    config.repo_root = root.path().to_path_buf();
    adjust(&mut config);

    let mut state = AppState::from_config(config, None).unwrap();
    state.archive_cache_dir = cache.path().to_path_buf();

    TestContext { root, cache, state }
}

pub fn app(ctx: &TestContext) -> Router {
    create_app(ctx.state.clone(), ListenerScheme::Http)
}

/// Creates `owner/name` under the context root, on branch `main` with a
/// committed `README.md`.
pub fn init_repo(ctx: &TestContext, owner: &str, name: &str) -> Repository {
    let path = ctx.root.path().join(owner).join(name);
    std::fs::create_dir_all(&path).unwrap();
    let mut opts = RepositoryInitOptions::new();
    opts.initial_head("main");
    let repo = Repository::init_opts(&path, &opts).unwrap();
    commit_file(&repo, "README.md", b"# readme\n", "initial commit");
    repo
}

/// Writes, stages, and commits a file on HEAD.
pub fn commit_file(repo: &Repository, path: &str, content: &[u8], message: &str) -> Oid {
    let workdir = repo.workdir().unwrap();
    let file = workdir.join(path);
    if let Some(parent) = file.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&file, content).unwrap();

    let mut index = repo.index().unwrap();
    index.add_path(Path::new(path)).unwrap();
    index.write().unwrap();
    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();

    let sig = Signature::now("Test", "test@example.com").unwrap();
    let parent = repo
        .head()
        .ok()
        .and_then(|h| h.target())
        .map(|oid| repo.find_commit(oid).unwrap());
    let parents: Vec<_> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .unwrap()
}

/// Blob id of `path` at HEAD.
pub fn head_blob_oid(repo: &Repository, path: &str) -> Oid {
    let head = repo.head().unwrap().peel_to_commit().unwrap();
    head.tree()
        .unwrap()
        .get_path(Path::new(path))
        .unwrap()
        .id()
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    app.clone()
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn get_with_host(app: &Router, uri: &str, host: &str) -> Response<Body> {
    app.clone()
        .oneshot(
            Request::get(uri)
                .header("host", host)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn json_body(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// True when a `git` binary is available for the smart-HTTP child process.
pub fn git_binary_available() -> bool {
    std::process::Command::new("git")
        .arg("--version")
        .output()
        .is_ok()
}
