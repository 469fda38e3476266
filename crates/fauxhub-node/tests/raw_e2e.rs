//! End-to-end tests for raw blob delivery.

mod common;

use common::*;

#[tokio::test]
async fn raw_file_on_main_branch() {
    let ctx = context();
    let repo = init_repo(&ctx, "owner1", "repo1");
    let app = app(&ctx);

    let response = get(&app, "/raw/owner1/repo1/main/README.md").await;
    assert_eq!(response.status(), 200);

    let expected_etag = head_blob_oid(&repo, "README.md").to_string();
    assert_eq!(
        response.headers().get("etag").unwrap().to_str().unwrap(),
        expected_etag
    );
    assert_eq!(
        response
            .headers()
            .get("cache-control")
            .unwrap()
            .to_str()
            .unwrap(),
        "max-age=0, private, must-revalidate"
    );
    assert_eq!(
        response
            .headers()
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap(),
        "text/markdown"
    );
    assert_eq!(body_bytes(response).await, b"# readme\n");
}

#[tokio::test]
async fn raw_infixed_route_serves_the_same_blob() {
    let ctx = context();
    init_repo(&ctx, "owner1", "repo1");
    let app = app(&ctx);

    let response = get(&app, "/owner1/repo1/raw/main/README.md").await;
    assert_eq!(response.status(), 200);
    assert_eq!(body_bytes(response).await, b"# readme\n");
}

#[tokio::test]
async fn redundant_slashes_in_subdirectories() {
    let ctx = context();
    let repo = init_repo(&ctx, "owner1", "repo1");
    commit_file(&repo, "sub/sub/some_file.txt", b"nested\n", "add nested");
    let app = app(&ctx);

    let response = get(&app, "/raw/owner1/repo1/main/sub/sub//some_file.txt").await;
    assert_eq!(response.status(), 200);
    assert_eq!(body_bytes(response).await, b"nested\n");
}

#[tokio::test]
async fn case_mismatch_is_rejected() {
    let ctx = context();
    init_repo(&ctx, "owner1", "repo1");
    let app = app(&ctx);

    let response = get(&app, "/raw/owner1/repo1/main/rEaDmE.md").await;
    assert_eq!(response.status(), 404);
    assert_eq!(body_bytes(response).await, b"not found.");
}

#[tokio::test]
async fn branch_name_containing_slash() {
    let ctx = context();
    let repo = init_repo(&ctx, "owner1", "repo1");
    let head = repo.head().unwrap().peel_to_commit().unwrap();
    repo.branch("branch/with_slash", &head, false).unwrap();
    let sha = head.id().to_string();
    let app = app(&ctx);

    let by_branch = get(&app, "/raw/owner1/repo1/branch/with_slash/README.md").await;
    assert_eq!(by_branch.status(), 200);
    let by_branch_body = body_bytes(by_branch).await;

    let by_sha = get(&app, &format!("/raw/owner1/repo1/{sha}/README.md")).await;
    assert_eq!(by_sha.status(), 200);
    assert_eq!(body_bytes(by_sha).await, by_branch_body);
}

#[tokio::test]
async fn shortened_sha_resolves_like_the_full_one() {
    let ctx = context();
    let repo = init_repo(&ctx, "owner1", "repo1");
    let sha = repo.head().unwrap().target().unwrap().to_string();
    let app = app(&ctx);

    let response = get(&app, &format!("/raw/owner1/repo1/{}/README.md", &sha[..8])).await;
    assert_eq!(response.status(), 200);
    assert_eq!(body_bytes(response).await, b"# readme\n");
}

#[tokio::test]
async fn uncommitted_file_served_only_at_checked_out_ref() {
    let ctx = context();
    let repo = init_repo(&ctx, "owner1", "repo1");
    // A branch frozen at the current commit; it stays equal to HEAD, so
    // pin a second commit on main first.
    let head = repo.head().unwrap().peel_to_commit().unwrap();
    repo.branch("frozen", &head, false).unwrap();
    commit_file(&repo, "second.txt", b"2", "second commit");

    // New file in the work tree, not committed anywhere.
    std::fs::write(repo.workdir().unwrap().join("wip.txt"), b"work in progress").unwrap();

    let app = app(&ctx);

    let at_head = get(&app, "/raw/owner1/repo1/main/wip.txt").await;
    assert_eq!(at_head.status(), 200);
    assert_eq!(body_bytes(at_head).await, b"work in progress");

    let at_frozen = get(&app, "/raw/owner1/repo1/frozen/wip.txt").await;
    assert_eq!(at_frozen.status(), 404);
}

#[tokio::test]
async fn modified_file_serves_dirty_bytes_at_head_only() {
    let ctx = context();
    let repo = init_repo(&ctx, "owner1", "repo1");
    let head = repo.head().unwrap().peel_to_commit().unwrap();
    repo.branch("frozen", &head, false).unwrap();
    commit_file(&repo, "second.txt", b"2", "second commit");

    std::fs::write(repo.workdir().unwrap().join("README.md"), b"# dirty\n").unwrap();

    let app = app(&ctx);

    let at_head = get(&app, "/raw/owner1/repo1/main/README.md").await;
    assert_eq!(body_bytes(at_head).await, b"# dirty\n");

    // A non-checked-out ref sees the committed content.
    let at_frozen = get(&app, "/raw/owner1/repo1/frozen/README.md").await;
    assert_eq!(body_bytes(at_frozen).await, b"# readme\n");
}

#[tokio::test]
async fn missing_repo_and_traversal_attempts_404() {
    let ctx = context();
    init_repo(&ctx, "owner1", "repo1");
    let app = app(&ctx);

    let response = get(&app, "/raw/owner1/unknown/main/README.md").await;
    assert_eq!(response.status(), 404);

    // Percent-encoded traversal collapses to a sanitized, nonexistent
    // directory under the root.
    let response = get(&app, "/raw/%2e%2e/%2e%2e/main/README.md").await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn virtual_repo_resolves_outside_the_root() {
    let elsewhere = tempfile::TempDir::new().unwrap();
    let repo_dir = elsewhere.path().join("special");
    std::fs::create_dir_all(&repo_dir).unwrap();

    let ctx = context_with(|config| {
        let mut repos = std::collections::HashMap::new();
        repos.insert(
            "special".to_string(),
            fauxhub_node::config::VirtualRepoConfig {
                path: repo_dir.clone(),
            },
        );
        config.virtual_repos.insert("owner1".to_string(), repos);
    });

    let mut opts = git2::RepositoryInitOptions::new();
    opts.initial_head("main");
    let repo = git2::Repository::init_opts(&repo_dir, &opts).unwrap();
    commit_file(&repo, "hello.txt", b"from elsewhere\n", "initial commit");

    let app = app(&ctx);
    let response = get(&app, "/raw/owner1/special/main/hello.txt").await;
    assert_eq!(response.status(), 200);
    assert_eq!(body_bytes(response).await, b"from elsewhere\n");
}

fn exploding_observer(_info: fauxhub_node::api::RawRequestInfo<'_>) {
    panic!("observer exploded");
}

#[tokio::test]
async fn panicking_observer_does_not_break_delivery() {
    let ctx = context();
    init_repo(&ctx, "owner1", "repo1");

    let mut state = ctx.state.clone();
    state.raw_observer = Some(std::sync::Arc::new(exploding_observer));
    let app = fauxhub_node::api::create_app(state, fauxhub_node::api::ListenerScheme::Http);

    let response = get(&app, "/raw/owner1/repo1/main/README.md").await;
    assert_eq!(response.status(), 200);
    assert_eq!(body_bytes(response).await, b"# readme\n");
}
