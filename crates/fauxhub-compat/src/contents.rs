//! Get-contents response shapes.

use serde::{Deserialize, Serialize};

use crate::base64_content;
use crate::urls::UrlContext;

/// The `_links` object attached to every contents entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentLinks {
    #[serde(rename = "self")]
    pub self_url: String,
    pub git: String,
    pub html: String,
}

/// A file or directory entry as returned by the contents endpoint.
///
/// A file requested directly carries `content`/`encoding`; file entries
/// inside a directory listing omit them. Directory entries report
/// `size: 0` and a null `download_url`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentEntry {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    pub size: u64,
    pub name: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub sha: String,
    pub url: String,
    pub git_url: String,
    pub html_url: String,
    /// Always serialized; `null` for directories.
    pub download_url: Option<String>,
    pub _links: ContentLinks,
}

impl ContentEntry {
    /// A file entry without inline content (directory listings).
    pub fn file(
        urls: &UrlContext,
        owner: &str,
        repo: &str,
        reference: &str,
        path: &str,
        sha: &str,
        size: u64,
    ) -> Self {
        let name = path.rsplit('/').next().unwrap_or(path).to_string();
        let self_url = urls.contents_api(owner, repo, path, reference);
        let git_url = urls.blob_api(owner, repo, sha);
        let html_url = urls.blob_html(owner, repo, reference, path);
        Self {
            kind: "file".to_string(),
            encoding: None,
            size,
            name,
            path: path.to_string(),
            content: None,
            sha: sha.to_string(),
            url: self_url.clone(),
            git_url: git_url.clone(),
            html_url: html_url.clone(),
            download_url: Some(urls.raw(owner, repo, reference, path)),
            _links: ContentLinks {
                self_url,
                git: git_url,
                html: html_url,
            },
        }
    }

    /// A directory entry.
    pub fn dir(
        urls: &UrlContext,
        owner: &str,
        repo: &str,
        reference: &str,
        path: &str,
        sha: &str,
    ) -> Self {
        let name = path.rsplit('/').next().unwrap_or(path).to_string();
        let self_url = urls.contents_api(owner, repo, path, reference);
        let git_url = urls.tree_api(owner, repo, sha);
        let html_url = urls.tree_html(owner, repo, reference, path);
        Self {
            kind: "dir".to_string(),
            encoding: None,
            size: 0,
            name,
            path: path.to_string(),
            content: None,
            sha: sha.to_string(),
            url: self_url.clone(),
            git_url: git_url.clone(),
            html_url: html_url.clone(),
            download_url: None,
            _links: ContentLinks {
                self_url,
                git: git_url,
                html: html_url,
            },
        }
    }

    /// Attaches base64 content (single-file responses).
    pub fn with_content(mut self, bytes: &[u8]) -> Self {
        self.encoding = Some("base64".to_string());
        self.content = Some(base64_content(bytes));
        self
    }
}

/// Query parameters for the contents endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentsQuery {
    #[serde(rename = "ref")]
    pub git_ref: Option<String>,
}
