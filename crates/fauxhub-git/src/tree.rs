//! Tree enumeration, flat and recursive.

use git2::{ObjectType, Oid};

use crate::error::Result;
use crate::objects::object_size;
use crate::repo::Repo;

/// A tree entry flattened to a `/`-separated path.
#[derive(Debug, Clone)]
pub struct FlatEntry {
    /// Path relative to the enumerated tree.
    pub path: String,
    /// Raw Git filemode (e.g. 0o100644, 0o40000, 0o160000).
    pub mode: i32,
    /// blob, tree, or commit (submodule).
    pub kind: ObjectType,
    pub oid: Oid,
    /// Byte size, populated for blobs only.
    pub size: Option<u64>,
}

/// Enumerates the tree `tree_oid` in depth-first order.
///
/// Each subdirectory appears as its own entry followed, when `deep`, by its
/// children with `/`-joined paths. Sub-trees are fetched by oid on
/// recursion. Submodules surface as `commit` entries and are not descended
/// into.
pub fn collect_tree_entries(
    repo: &Repo,
    tree_oid: Oid,
    prefix: &str,
    deep: bool,
) -> Result<Vec<FlatEntry>> {
    let mut acc = Vec::new();
    collect_into(repo, tree_oid, prefix, deep, &mut acc)?;
    Ok(acc)
}

fn collect_into(
    repo: &Repo,
    tree_oid: Oid,
    prefix: &str,
    deep: bool,
    acc: &mut Vec<FlatEntry>,
) -> Result<()> {
    let tree = repo.raw().find_tree(tree_oid)?;

    for entry in tree.iter() {
        let name = String::from_utf8_lossy(entry.name_bytes()).into_owned();
        let path = if prefix.is_empty() {
            name
        } else {
            format!("{prefix}/{name}")
        };
        let kind = entry.kind().unwrap_or(ObjectType::Any);
        let size = match kind {
            ObjectType::Blob => Some(object_size(repo, entry.id())?),
            _ => None,
        };

        acc.push(FlatEntry {
            path: path.clone(),
            mode: entry.filemode(),
            kind,
            oid: entry.id(),
            size,
        });

        if deep && kind == ObjectType::Tree {
            collect_into(repo, entry.id(), &path, deep, acc)?;
        }
    }
    Ok(())
}
