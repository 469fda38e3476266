//! End-to-end tests for the Smart HTTP transport.
//!
//! These spawn a real `git` child process and are skipped when no git
//! binary is on PATH.

mod common;

use common::*;

#[tokio::test]
async fn info_refs_advertises_service_and_refs() {
    if !git_binary_available() {
        eprintln!("skipping: no git binary on PATH");
        return;
    }

    let ctx = context();
    init_repo(&ctx, "owner1", "repo1");
    let app = app(&ctx);

    let response = get(
        &app,
        "/owner1/repo1.git/info/refs?service=git-upload-pack",
    )
    .await;
    assert_eq!(response.status(), 200);
    assert_eq!(
        response
            .headers()
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap(),
        "application/x-git-upload-pack-advertisement"
    );

    let body = body_bytes(response).await;
    assert!(body.starts_with(b"001e# service=git-upload-pack\n0000"));
    let text = String::from_utf8_lossy(&body);
    assert!(text.contains("refs/heads/main"));
}

#[tokio::test]
async fn git_suffix_is_optional_for_discovery() {
    if !git_binary_available() {
        eprintln!("skipping: no git binary on PATH");
        return;
    }

    let ctx = context();
    init_repo(&ctx, "owner1", "repo1");
    let app = app(&ctx);

    let response = get(&app, "/owner1/repo1/info/refs?service=git-upload-pack").await;
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn unknown_service_is_a_bad_request() {
    let ctx = context();
    init_repo(&ctx, "owner1", "repo1");
    let app = app(&ctx);

    let response = get(&app, "/owner1/repo1.git/info/refs?service=git-annex").await;
    assert_eq!(response.status(), 400);

    let response = get(&app, "/owner1/repo1.git/info/refs").await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn missing_repository_is_404() {
    let ctx = context();
    let app = app(&ctx);

    let response = get(&app, "/owner1/ghost.git/info/refs?service=git-upload-pack").await;
    assert_eq!(response.status(), 404);
}

/// Full clone through a real listener: the round trip a Git client makes.
#[tokio::test(flavor = "multi_thread")]
async fn git_clone_round_trips_the_repository() {
    if !git_binary_available() {
        eprintln!("skipping: no git binary on PATH");
        return;
    }

    let root = tempfile::TempDir::new().unwrap();
    let repo_dir = root.path().join("owner1").join("repo1");
    std::fs::create_dir_all(&repo_dir).unwrap();
    let mut opts = git2::RepositoryInitOptions::new();
    opts.initial_head("main");
    let repo = git2::Repository::init_opts(&repo_dir, &opts).unwrap();
    commit_file(&repo, "README.md", b"# cloned\n", "initial commit");
    commit_file(&repo, "src/lib.rs", b"pub fn f() {}\n", "add lib");

    let mut config = fauxhub_node::config::NodeConfig::default();
    config.repo_root = root.path().to_path_buf();
    config.listen.http.port = 0;

    let handle = fauxhub_node::server::Server::new(config)
        .start()
        .await
        .unwrap();
    let port = handle.http_port;

    let clone_dir = tempfile::TempDir::new().unwrap();
    let target = clone_dir.path().join("cloned");
    let output = std::process::Command::new("git")
        .arg("clone")
        .arg(format!("http://127.0.0.1:{port}/owner1/repo1.git"))
        .arg(&target)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git clone failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    assert_eq!(
        std::fs::read(target.join("README.md")).unwrap(),
        b"# cloned\n"
    );
    assert_eq!(
        std::fs::read(target.join("src/lib.rs")).unwrap(),
        b"pub fn f() {}\n"
    );

    // The cloned HEAD matches the source HEAD.
    let cloned = git2::Repository::open(&target).unwrap();
    assert_eq!(
        cloned.head().unwrap().target(),
        repo.head().unwrap().target()
    );
}
