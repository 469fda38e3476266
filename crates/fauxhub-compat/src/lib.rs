//! GitHub-compatible response shapes.
//!
//! Encoders receive already-resolved Git data and produce the JSON bodies,
//! archive bytes, and error shapes the public GitHub services emit.

mod archive;
mod blob;
mod commits;
mod contents;
mod error;
mod tree;
mod urls;

pub use archive::{
    archive_file_name, create_archive, ArchiveEntry, ArchiveFormat, TarGzBuilder, ZipBuilder,
};
pub use blob::{validate_blob_sha, BlobResponse};
pub use commits::{
    format_date, CommitDetail, CommitIdentity, CommitListItem, ParentRef, ShaUrl, UserStub,
    Verification,
};
pub use contents::{ContentEntry, ContentLinks, ContentsQuery};
pub use error::{CompatError, Result, DOCS_URL};
pub use tree::{recursive_requested, TreeItem, TreeResponse};
pub use urls::{gravatar_url, UrlContext};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Base64 content the way the GitHub API ships it: standard alphabet with a
/// trailing newline.
pub fn base64_content(bytes: &[u8]) -> String {
    let mut encoded = STANDARD.encode(bytes);
    encoded.push('\n');
    encoded
}
