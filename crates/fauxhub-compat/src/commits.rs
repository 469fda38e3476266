//! List-commits response shape.

use chrono::{SecondsFormat, TimeZone, Utc};
use fauxhub_git::CommitInfo;
use serde::{Deserialize, Serialize};

use crate::urls::{gravatar_url, UrlContext};

/// Author or committer identity inside the `commit` object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitIdentity {
    pub name: String,
    pub email: String,
    /// ISO-8601 with milliseconds, UTC.
    pub date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShaUrl {
    pub sha: String,
    pub url: String,
}

/// Signature verification stub; this server never signs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verification {
    pub verified: bool,
    pub reason: String,
    pub signature: String,
    pub payload: String,
}

impl Default for Verification {
    fn default() -> Self {
        Self {
            verified: false,
            reason: "not implemented".to_string(),
            signature: "not implemented".to_string(),
            payload: "not implemented".to_string(),
        }
    }
}

/// The nested `commit` object of a listing element.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitDetail {
    pub author: CommitIdentity,
    pub committer: CommitIdentity,
    pub message: String,
    pub tree: ShaUrl,
    pub url: String,
    pub comment_count: u64,
    pub verification: Verification,
}

/// Gravatar-backed user stub for the top-level author/committer fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserStub {
    pub avatar_url: String,
    pub gravatar_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParentRef {
    pub sha: String,
    pub url: String,
    pub html_url: String,
}

/// One element of `GET /api/repos/:owner/:repo/commits`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitListItem {
    pub sha: String,
    pub node_id: String,
    pub commit: CommitDetail,
    pub url: String,
    pub html_url: String,
    pub comments_url: String,
    pub author: UserStub,
    pub committer: UserStub,
    pub parents: Vec<ParentRef>,
}

/// Formats UNIX seconds as ISO-8601 UTC with milliseconds.
pub fn format_date(seconds: i64) -> String {
    Utc.timestamp_opt(seconds, 0)
        .single()
        .unwrap_or_else(|| Utc.timestamp_opt(0, 0).single().unwrap())
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl CommitListItem {
    pub fn new(urls: &UrlContext, owner: &str, repo: &str, info: &CommitInfo) -> Self {
        let sha = info.id.to_string();
        let tree_sha = info.tree_id.to_string();

        let parents = info
            .parent_ids
            .iter()
            .map(|parent| {
                let parent_sha = parent.to_string();
                ParentRef {
                    url: urls.commit_api(owner, repo, &parent_sha),
                    html_url: urls.commit_html(owner, repo, &parent_sha),
                    sha: parent_sha,
                }
            })
            .collect();

        Self {
            node_id: "not implemented".to_string(),
            commit: CommitDetail {
                author: CommitIdentity {
                    name: info.author.name.clone(),
                    email: info.author.email.clone(),
                    date: format_date(info.author.seconds),
                },
                committer: CommitIdentity {
                    name: info.committer.name.clone(),
                    email: info.committer.email.clone(),
                    date: format_date(info.committer.seconds),
                },
                message: info.message.clone(),
                tree: ShaUrl {
                    sha: tree_sha.clone(),
                    url: urls.tree_api(owner, repo, &tree_sha),
                },
                url: urls.git_commit_api(owner, repo, &sha),
                comment_count: 0,
                verification: Verification::default(),
            },
            url: urls.commit_api(owner, repo, &sha),
            html_url: urls.commit_html(owner, repo, &sha),
            comments_url: urls.commit_comments_api(owner, repo, &sha),
            author: UserStub {
                avatar_url: gravatar_url(&info.author.email),
                gravatar_id: String::new(),
            },
            committer: UserStub {
                avatar_url: gravatar_url(&info.committer.email),
                gravatar_id: String::new(),
            },
            sha,
            parents,
        }
    }
}
