//! Self-referential URL composition.
//!
//! Every emitted URL is absolute and points back at this server. When the
//! request arrived through subdomain mapping, the node layer substitutes
//! `localhost:<port>` for the external host before constructing the
//! context, so the emitted URLs stay resolvable for plain clients.

/// Scheme and authority of the server as seen by the requesting client.
#[derive(Debug, Clone)]
pub struct UrlContext {
    scheme: String,
    authority: String,
}

impl UrlContext {
    pub fn new(scheme: impl Into<String>, authority: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            authority: authority.into(),
        }
    }

    /// `<scheme>://<authority>`
    pub fn base(&self) -> String {
        format!("{}://{}", self.scheme, self.authority)
    }

    pub fn blob_api(&self, owner: &str, repo: &str, sha: &str) -> String {
        format!("{}/api/repos/{owner}/{repo}/git/blobs/{sha}", self.base())
    }

    pub fn tree_api(&self, owner: &str, repo: &str, sha: &str) -> String {
        format!("{}/api/repos/{owner}/{repo}/git/trees/{sha}", self.base())
    }

    pub fn contents_api(&self, owner: &str, repo: &str, path: &str, reference: &str) -> String {
        format!(
            "{}/api/repos/{owner}/{repo}/contents/{path}?ref={reference}",
            self.base()
        )
    }

    pub fn commit_api(&self, owner: &str, repo: &str, sha: &str) -> String {
        format!("{}/api/repos/{owner}/{repo}/commits/{sha}", self.base())
    }

    pub fn git_commit_api(&self, owner: &str, repo: &str, sha: &str) -> String {
        format!("{}/api/repos/{owner}/{repo}/git/commits/{sha}", self.base())
    }

    pub fn commit_comments_api(&self, owner: &str, repo: &str, sha: &str) -> String {
        format!(
            "{}/api/repos/{owner}/{repo}/commits/{sha}/comments",
            self.base()
        )
    }

    pub fn commit_html(&self, owner: &str, repo: &str, sha: &str) -> String {
        format!("{}/{owner}/{repo}/commit/{sha}", self.base())
    }

    pub fn blob_html(&self, owner: &str, repo: &str, reference: &str, path: &str) -> String {
        format!("{}/{owner}/{repo}/blob/{reference}/{path}", self.base())
    }

    pub fn tree_html(&self, owner: &str, repo: &str, reference: &str, path: &str) -> String {
        format!("{}/{owner}/{repo}/tree/{reference}/{path}", self.base())
    }

    pub fn raw(&self, owner: &str, repo: &str, reference: &str, path: &str) -> String {
        format!("{}/raw/{owner}/{repo}/{reference}/{path}", self.base())
    }

    /// The codeload download URL for an archive format segment
    /// (`zip` | `tar.gz`).
    pub fn codeload(&self, owner: &str, repo: &str, format: &str, reference: &str) -> String {
        format!(
            "{}/codeload/{owner}/{repo}/{format}/{reference}",
            self.base()
        )
    }
}

/// Gravatar URL for a commit author, keyed by the md5 of the lowercased
/// e-mail address.
pub fn gravatar_url(email: &str) -> String {
    let digest = md5::compute(email.trim().to_lowercase().as_bytes());
    format!("https://www.gravatar.com/avatar/{digest:x}")
}
