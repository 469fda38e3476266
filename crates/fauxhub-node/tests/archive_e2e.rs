//! End-to-end tests for codeload archive downloads.

mod common;

use common::*;

/// Entry names of a tar.gz body.
fn tar_entries(bytes: &[u8]) -> Vec<String> {
    let decoder = flate2::read::GzDecoder::new(bytes);
    let mut archive = tar::Archive::new(decoder);
    archive
        .entries()
        .unwrap()
        .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
        .collect()
}

/// Entry names of a zip body.
fn zip_entries(bytes: &[u8]) -> Vec<String> {
    let reader = std::io::Cursor::new(bytes.to_vec());
    let mut archive = zip::ZipArchive::new(reader).unwrap();
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}

#[tokio::test]
async fn tar_gz_download_contains_committed_files() {
    let ctx = context();
    let repo = init_repo(&ctx, "owner1", "repo1");
    commit_file(&repo, "sub/file.txt", b"in sub\n", "add sub file");
    // Detach-proof the uncommitted gate: archives of a checked-out ref
    // come from the work tree, so request a frozen branch instead.
    let head = repo.head().unwrap().peel_to_commit().unwrap();
    repo.branch("frozen", &head, false).unwrap();
    commit_file(&repo, "later.txt", b"later\n", "move main forward");

    let app = app(&ctx);
    let response = get(&app, "/codeload/owner1/repo1/tar.gz/frozen").await;
    assert_eq!(response.status(), 200);
    assert_eq!(
        response
            .headers()
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap(),
        "application/x-gzip"
    );
    let disposition = response
        .headers()
        .get("content-disposition")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=owner1-repo1-"));
    assert!(disposition.ends_with(".tgz"));

    let bytes = body_bytes(response).await;
    assert_eq!(&bytes[..2], &[0x1f, 0x8b]);

    let entries = tar_entries(&bytes);
    assert!(entries.contains(&"README.md".to_string()));
    assert!(entries.contains(&"sub/".to_string()));
    assert!(entries.contains(&"sub/file.txt".to_string()));
    assert!(!entries.contains(&"later.txt".to_string()));
}

#[tokio::test]
async fn zip_download_has_magic_and_entries() {
    let ctx = context();
    let repo = init_repo(&ctx, "owner1", "repo1");
    let head = repo.head().unwrap().peel_to_commit().unwrap();
    repo.branch("frozen", &head, false).unwrap();
    commit_file(&repo, "later.txt", b"later\n", "move main forward");

    let app = app(&ctx);
    let response = get(&app, "/codeload/owner1/repo1/zip/frozen").await;
    assert_eq!(response.status(), 200);
    assert_eq!(
        response
            .headers()
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap(),
        "application/zip"
    );

    let bytes = body_bytes(response).await;
    assert_eq!(&bytes[..2], b"PK");
    assert!(zip_entries(&bytes).contains(&"README.md".to_string()));
}

#[tokio::test]
async fn committed_archives_are_cached_and_idempotent() {
    let ctx = context();
    let repo = init_repo(&ctx, "owner1", "repo1");
    let frozen = repo.head().unwrap().peel_to_commit().unwrap();
    repo.branch("frozen", &frozen, false).unwrap();
    commit_file(&repo, "later.txt", b"later\n", "move main forward");
    let sha = frozen.id().to_string();

    let app = app(&ctx);

    let first = get(&app, "/codeload/owner1/repo1/zip/frozen").await;
    assert_eq!(first.status(), 200);
    let first_bytes = body_bytes(first).await;

    // The cache file exists under the commit-keyed name.
    let cached = ctx.cache.path().join(format!("owner1-repo1-{sha}.zip"));
    assert!(cached.is_file(), "expected cache file {}", cached.display());

    let second = get(&app, "/codeload/owner1/repo1/zip/frozen").await;
    assert_eq!(second.status(), 200);
    let second_bytes = body_bytes(second).await;
    assert_eq!(first_bytes, second_bytes);

    // The cached file is exactly what gets served.
    assert_eq!(std::fs::read(&cached).unwrap(), second_bytes);
}

#[tokio::test]
async fn checked_out_ref_archives_the_work_tree_snapshot() {
    let ctx = context();
    let repo = init_repo(&ctx, "owner1", "repo1");
    std::fs::write(repo.workdir().unwrap().join("wip.txt"), b"uncommitted\n").unwrap();

    let app = app(&ctx);
    let response = get(&app, "/codeload/owner1/repo1/tar.gz/main").await;
    assert_eq!(response.status(), 200);
    let disposition = response
        .headers()
        .get("content-disposition")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert_eq!(
        disposition,
        "attachment; filename=owner1-repo1-SNAPSHOT.tgz"
    );

    let bytes = body_bytes(response).await;
    let entries = tar_entries(&bytes);
    assert!(entries.contains(&"wip.txt".to_string()));

    // Snapshots are never written to the cache.
    let leftovers: Vec<_> = std::fs::read_dir(ctx.cache.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .collect();
    assert!(leftovers.is_empty());
}

#[tokio::test]
async fn work_tree_snapshot_honors_gitignore_and_skips_git_dir() {
    let ctx = context();
    let repo = init_repo(&ctx, "owner1", "repo1");
    let workdir = repo.workdir().unwrap();
    commit_file(&repo, ".gitignore", b"target/\n*.log\n", "add gitignore");
    std::fs::create_dir_all(workdir.join("target")).unwrap();
    std::fs::write(workdir.join("target/out.bin"), b"junk").unwrap();
    std::fs::write(workdir.join("debug.log"), b"junk").unwrap();
    std::fs::write(workdir.join("kept.txt"), b"kept\n").unwrap();

    let app = app(&ctx);
    let response = get(&app, "/codeload/owner1/repo1/tar.gz/main").await;
    let bytes = body_bytes(response).await;
    let entries = tar_entries(&bytes);

    assert!(entries.contains(&"kept.txt".to_string()));
    assert!(entries.contains(&".gitignore".to_string()));
    assert!(!entries.iter().any(|e| e.starts_with("target")));
    assert!(!entries.contains(&"debug.log".to_string()));
    assert!(!entries.iter().any(|e| e.starts_with(".git/")));
}

#[tokio::test]
async fn legacy_format_segments_work() {
    let ctx = context();
    let repo = init_repo(&ctx, "owner1", "repo1");
    let head = repo.head().unwrap().peel_to_commit().unwrap();
    repo.branch("frozen", &head, false).unwrap();
    commit_file(&repo, "later.txt", b"later\n", "move main forward");

    let app = app(&ctx);
    let response = get(&app, "/codeload/owner1/repo1/legacy.zip/frozen").await;
    assert_eq!(response.status(), 200);
    let bytes = body_bytes(response).await;
    assert_eq!(&bytes[..2], b"PK");
}

#[tokio::test]
async fn unknown_format_and_ref_are_404() {
    let ctx = context();
    init_repo(&ctx, "owner1", "repo1");
    let app = app(&ctx);

    let response = get(&app, "/codeload/owner1/repo1/rar/main").await;
    assert_eq!(response.status(), 404);

    let response = get(&app, "/codeload/owner1/repo1/zip/no-such-ref").await;
    assert_eq!(response.status(), 404);
}
