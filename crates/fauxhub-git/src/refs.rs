//! Ref and path parsing.
//!
//! URL segments of the form `<ref>/<path...>` are ambiguous because branch
//! and tag names may themselves contain `/`. Disambiguation enumerates the
//! repository's refs and picks the longest one that prefixes the segment.

use git2::{ObjectType, Oid};

use crate::error::{GitAccessError, Result};
use crate::repo::Repo;

/// Outcome of splitting a `<ref>/<path>` URL segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefAndPath {
    /// A known branch or tag name was found as a prefix.
    Known { reference: String, path: String },
    /// No branch or tag matched; the first slash-delimited token is a
    /// plausible SHA and the rest is the path.
    Unresolved { reference: String, path: String },
}

impl RefAndPath {
    /// The ref component, however it was decided.
    pub fn reference(&self) -> &str {
        match self {
            RefAndPath::Known { reference, .. } => reference,
            RefAndPath::Unresolved { reference, .. } => reference,
        }
    }

    /// The path component, possibly empty.
    pub fn path(&self) -> &str {
        match self {
            RefAndPath::Known { path, .. } => path,
            RefAndPath::Unresolved { path, .. } => path,
        }
    }
}

/// Splits `s` into `(ref, path)` against the repository's branches and tags.
///
/// The longest ref that is a prefix of `s` terminated by `/` (or equal to
/// `s`) wins. When nothing matches, the first token is handed back as a
/// candidate SHA for the caller to resolve.
pub fn split_ref_path(repo: &Repo, s: &str) -> Result<RefAndPath> {
    let mut candidates = repo.branch_names()?;
    candidates.extend(repo.tag_names()?);

    let mut best: Option<&str> = None;
    for name in &candidates {
        let matches = s == name
            || (s.len() > name.len() && s.starts_with(name.as_str()) && s.as_bytes()[name.len()] == b'/');
        if matches && best.map_or(true, |b| name.len() > b.len()) {
            best = Some(name);
        }
    }

    match best {
        Some(name) => {
            let path = if s.len() > name.len() {
                s[name.len() + 1..].to_string()
            } else {
                String::new()
            };
            Ok(RefAndPath::Known {
                reference: name.to_string(),
                path,
            })
        }
        None => {
            let (reference, path) = match s.split_once('/') {
                Some((r, p)) => (r.to_string(), p.to_string()),
                None => (s.to_string(), String::new()),
            };
            Ok(RefAndPath::Unresolved { reference, path })
        }
    }
}

/// True when `s` is exactly a full 40-hex object id.
pub fn is_full_sha(s: &str) -> bool {
    s.len() == 40 && s.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase())
}

/// Resolves a ref name, full SHA, or shortened SHA prefix to a commit id.
///
/// Resolution order: full SHA → branch/tag lookup → shortened-oid
/// expansion. Annotated tags are peeled to the commit they point at. An
/// ambiguous prefix surfaces as NotFound.
pub fn resolve_commit(repo: &Repo, ref_or_sha: &str) -> Result<Oid> {
    if is_full_sha(ref_or_sha) {
        let oid = Oid::from_str(ref_or_sha)?;
        let obj = repo.raw().find_object(oid, None)?;
        let commit = obj
            .peel(ObjectType::Commit)
            .map_err(|_| GitAccessError::InvalidRef(format!("{ref_or_sha} is not a commit")))?;
        return Ok(commit.id());
    }

    if let Ok(reference) = repo.raw().resolve_reference_from_short_name(ref_or_sha) {
        let commit = reference.peel_to_commit()?;
        return Ok(commit.id());
    }

    // Shortened-oid expansion. libgit2 reports collisions as ambiguous,
    // which maps to NotFound rather than a guess.
    let obj = repo
        .raw()
        .revparse_single(ref_or_sha)
        .map_err(GitAccessError::from)?;
    let commit = obj
        .peel(ObjectType::Commit)
        .map_err(|_| GitAccessError::NotFound(format!("{ref_or_sha} does not name a commit")))?;
    Ok(commit.id())
}
