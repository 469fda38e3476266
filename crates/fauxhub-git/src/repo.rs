//! Per-request repository handle.

use std::path::{Path, PathBuf};

use git2::{BranchType, Oid, Repository};

use crate::error::{GitAccessError, Result};
use crate::refs::resolve_commit;

/// Where HEAD currently points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadState {
    /// HEAD is a symbolic ref to a branch.
    Branch(String),
    /// HEAD points directly at a commit.
    Detached,
}

/// A handle to an on-disk repository, opened lazily per request and dropped
/// when the request completes.
pub struct Repo {
    inner: Repository,
    path: PathBuf,
}

impl Repo {
    /// Opens the repository at `path` (bare or with a working tree).
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let inner = Repository::open(path)
            .map_err(|_| GitAccessError::NotFound(format!("no repository at {}", path.display())))?;
        Ok(Self {
            inner,
            path: path.to_path_buf(),
        })
    }

    /// The path this handle was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Access to the underlying libgit2 repository.
    pub fn raw(&self) -> &Repository {
        &self.inner
    }

    /// True for repositories without a working tree.
    pub fn is_bare(&self) -> bool {
        self.inner.is_bare()
    }

    /// The working tree root, when one exists.
    pub fn workdir(&self) -> Option<&Path> {
        self.inner.workdir()
    }

    /// Short name of HEAD if symbolic, `Detached` otherwise.
    pub fn current_branch(&self) -> Result<HeadState> {
        if self.inner.head_detached()? {
            return Ok(HeadState::Detached);
        }
        let head = self.inner.head()?;
        let name = head
            .shorthand()
            .ok_or_else(|| GitAccessError::InvalidRef("HEAD is not valid utf-8".into()))?;
        Ok(HeadState::Branch(name.to_string()))
    }

    /// The branch used when a request names no ref: `main` if present, else
    /// `master`, else whatever HEAD points at.
    pub fn default_branch(&self) -> Result<String> {
        for candidate in ["main", "master"] {
            if self.inner.find_branch(candidate, BranchType::Local).is_ok() {
                return Ok(candidate.to_string());
            }
        }
        match self.current_branch()? {
            HeadState::Branch(name) => Ok(name),
            HeadState::Detached => {
                let head = self.inner.head()?;
                let oid = head
                    .target()
                    .ok_or_else(|| GitAccessError::NotFound("unborn HEAD".into()))?;
                Ok(oid.to_string())
            }
        }
    }

    /// The commit HEAD resolves to.
    pub fn head_commit(&self) -> Result<Oid> {
        let head = self.inner.head()?;
        let commit = head.peel_to_commit()?;
        Ok(commit.id())
    }

    /// True iff the repository is non-bare and `reference` resolves to the
    /// same commit as HEAD.
    ///
    /// This is the gate for serving uncommitted content: a non-bare
    /// repository whose checked-out ref is requested delivers the working
    /// tree, everything else delivers committed objects.
    pub fn is_checked_out(&self, reference: &str) -> bool {
        if self.is_bare() {
            return false;
        }
        let head = match self.head_commit() {
            Ok(oid) => oid,
            Err(_) => return false,
        };
        match resolve_commit(self, reference) {
            Ok(oid) => oid == head,
            Err(_) => false,
        }
    }

    /// All local branch short names.
    pub fn branch_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for branch in self.inner.branches(Some(BranchType::Local))? {
            let (branch, _) = branch?;
            if let Some(name) = branch.name()? {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }

    /// All tag names.
    pub fn tag_names(&self) -> Result<Vec<String>> {
        let names = self.inner.tag_names(None)?;
        Ok(names.iter().flatten().map(|s| s.to_string()).collect())
    }
}

impl std::fmt::Debug for Repo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repo")
            .field("path", &self.path)
            .field("bare", &self.is_bare())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::fixture_repo;

    #[test]
    fn open_missing_repo_is_not_found() {
        let err = Repo::open("/nonexistent/nowhere").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn current_branch_reports_head() {
        let (dir, _) = fixture_repo();
        let repo = Repo::open(dir.path()).unwrap();
        assert_eq!(
            repo.current_branch().unwrap(),
            HeadState::Branch("main".to_string())
        );
    }

    #[test]
    fn default_branch_prefers_main() {
        let (dir, _) = fixture_repo();
        let repo = Repo::open(dir.path()).unwrap();
        assert_eq!(repo.default_branch().unwrap(), "main");
    }

    #[test]
    fn head_ref_is_checked_out() {
        let (dir, _) = fixture_repo();
        let repo = Repo::open(dir.path()).unwrap();
        assert!(repo.is_checked_out("main"));
        assert!(!repo.is_checked_out("no-such-branch"));
    }

    #[test]
    fn full_sha_of_head_counts_as_checked_out() {
        let (dir, _) = fixture_repo();
        let repo = Repo::open(dir.path()).unwrap();
        let head = repo.head_commit().unwrap().to_string();
        assert!(repo.is_checked_out(&head));
    }
}
