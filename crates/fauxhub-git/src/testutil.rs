//! Shared fixtures for unit tests.

use std::path::Path;

use git2::{Oid, Repository, RepositoryInitOptions, Signature};
use tempfile::TempDir;

/// Creates a non-bare repository on branch `main` with a committed
/// `README.md`.
pub fn fixture_repo() -> (TempDir, Repository) {
    let dir = TempDir::new().unwrap();
    let mut opts = RepositoryInitOptions::new();
    opts.initial_head("main");
    let repo = Repository::init_opts(dir.path(), &opts).unwrap();
    commit_file(&repo, "README.md", b"# fixture\n", "initial commit");
    (dir, repo)
}

/// Writes `path` (creating parent directories) in the working tree, stages
/// it, and commits on HEAD.
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

    let sig = Signature::now("Fixture", "fixture@example.com").unwrap();
    let parent = repo
        .head()
        .ok()
        .and_then(|h| h.target())
        .map(|oid| repo.find_commit(oid).unwrap());
    let parents: Vec<_> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .unwrap()
}

/// Removes `path` from the index and working tree and commits the deletion.
pub fn commit_removal(repo: &Repository, path: &str, message: &str) -> Oid {
    let workdir = repo.workdir().unwrap();
    std::fs::remove_file(workdir.join(path)).unwrap();

    let mut index = repo.index().unwrap();
    index.remove_path(Path::new(path)).unwrap();
    index.write().unwrap();
    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();

    let sig = Signature::now("Fixture", "fixture@example.com").unwrap();
    let parent = repo
        .head()
        .unwrap()
        .target()
        .map(|oid| repo.find_commit(oid).unwrap())
        .unwrap();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &[&parent])
        .unwrap()
}
