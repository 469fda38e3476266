//! Repository resolution and Git object access.
//!
//! Everything here is read-only and operates on repositories that may be
//! concurrently edited on disk: handles are opened per request and state is
//! re-derived rather than cached.

mod error;
mod log;
mod objects;
mod refs;
mod repo;
mod resolver;
mod tree;

#[cfg(test)]
mod testutil;

pub use error::{GitAccessError, Result};
pub use log::{commit_log, CommitInfo, SignatureInfo};
pub use objects::{
    blob_oid_in_commit, normalize_path, object, object_size, raw_content, read_blob, resolve_blob,
    resolve_object, resolve_tree_oid, work_tree_status, BlobSource, ResolvedBlob, ResolvedObject,
    WorkTreeStatus,
};
pub use refs::{is_full_sha, resolve_commit, split_ref_path, RefAndPath};
pub use tree::{collect_tree_entries, FlatEntry};
pub use repo::{HeadState, Repo};
pub use resolver::{RepoResolver, VirtualRepo};

pub use git2::{ObjectType, Oid};
