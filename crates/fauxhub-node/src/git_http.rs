//! Git Smart HTTP transport.
//!
//! The framed protocol work is delegated to a child `git` process in
//! stateless-rpc mode; this module decodes the request, wires up stdio,
//! and sets the content types the client expects. Both directions are
//! streamed: the request body is fed to the child's stdin as it arrives,
//! and the child's stdout flows to the client without being collected
//! first. A packfile never sits whole in process memory.

use std::io::Read;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;
use std::task::{Context, Poll};

use axum::body::{Body, Bytes};
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio_util::io::ReaderStream;

use crate::api::AppState;
use crate::error::ApiError;

/// The two Smart HTTP services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitService {
    UploadPack,
    ReceivePack,
}

impl GitService {
    fn from_str(s: &str) -> Option<Self> {
        match s {
            "git-upload-pack" => Some(GitService::UploadPack),
            "git-receive-pack" => Some(GitService::ReceivePack),
            _ => None,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            GitService::UploadPack => "git-upload-pack",
            GitService::ReceivePack => "git-receive-pack",
        }
    }

    fn subcommand(&self) -> &'static str {
        match self {
            GitService::UploadPack => "upload-pack",
            GitService::ReceivePack => "receive-pack",
        }
    }

    fn advertisement_content_type(&self) -> &'static str {
        match self {
            GitService::UploadPack => "application/x-git-upload-pack-advertisement",
            GitService::ReceivePack => "application/x-git-receive-pack-advertisement",
        }
    }

    fn result_content_type(&self) -> &'static str {
        match self {
            GitService::UploadPack => "application/x-git-upload-pack-result",
            GitService::ReceivePack => "application/x-git-receive-pack-result",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct InfoRefsQuery {
    service: Option<String>,
}

fn pkt_line(data: &str) -> Vec<u8> {
    format!("{:04x}{data}", data.len() + 4).into_bytes()
}

fn pkt_flush() -> Vec<u8> {
    b"0000".to_vec()
}

/// Clients may clone with or without the `.git` suffix.
fn trim_git_suffix(repo: &str) -> &str {
    repo.strip_suffix(".git").unwrap_or(repo)
}

fn repo_dir(state: &AppState, owner: &str, repo: &str) -> Result<PathBuf, ApiError> {
    let path = state.resolver.resolve(owner, trim_git_suffix(repo));
    // Opening validates this is actually a repository before a child
    // process is spawned against it.
    fauxhub_git::Repo::open(&path).map_err(|_| ApiError::NotFound)?;
    Ok(path)
}

/// True when the client declared a gzip-compressed request body.
fn is_gzip(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("gzip"))
}

fn gunzip(compressed: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut decoded = Vec::new();
    flate2::read::GzDecoder::new(compressed)
        .read_to_end(&mut decoded)?;
    Ok(decoded)
}

/// Spawns `git upload-pack|receive-pack --stateless-rpc` against the
/// repository with piped stdio. The client's `Git-Protocol` header is
/// propagated so protocol-v2 negotiation reaches the child.
fn spawn_git(
    repo_path: &std::path::Path,
    service: GitService,
    advertise: bool,
    headers: &HeaderMap,
) -> Result<Child, ApiError> {
    let mut cmd = Command::new("git");
    cmd.arg(service.subcommand());
    if advertise {
        cmd.arg("--advertise-refs");
    }
    cmd.arg("--stateless-rpc");
    cmd.arg(repo_path);
    if let Some(proto) = headers.get("Git-Protocol").and_then(|v| v.to_str().ok()) {
        cmd.env("GIT_PROTOCOL", proto);
    }
    cmd.stdin(Stdio::piped());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    // A disconnected client must not leave the child running; the child
    // rides inside the response stream and is killed when that drops.
    cmd.kill_on_drop(true);

    cmd.spawn()
        .map_err(|e| ApiError::Internal(format!("failed to spawn git: {e}")))
}

/// Forwards the child's stderr to the log without blocking the transfer.
fn drain_stderr(child: &mut Child, service: GitService) {
    let Some(mut stderr) = child.stderr.take() else {
        return;
    };
    tokio::spawn(async move {
        let mut buf = String::new();
        if stderr.read_to_string(&mut buf).await.is_ok() && !buf.trim().is_empty() {
            tracing::debug!(service = service.as_str(), stderr = %buf.trim(), "git transport stderr");
        }
    });
}

/// Streams a reader (the child's stdout, possibly behind a preamble)
/// while owning the child, so that dropping the response body mid-stream
/// kills the process instead of leaking it.
struct GitResponseStream<R> {
    inner: ReaderStream<R>,
    _child: Child,
}

impl<R: AsyncRead + Unpin> Stream for GitResponseStream<R> {
    type Item = std::io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().inner).poll_next(cx)
    }
}

fn git_body<R>(reader: R, child: Child) -> Body
where
    R: AsyncRead + Unpin + Send + 'static,
{
    Body::from_stream(GitResponseStream {
        inner: ReaderStream::new(reader),
        _child: child,
    })
}

/// Feeds the request body to the child's stdin as chunks arrive, then
/// closes the pipe. Gzip-encoded bodies are decoded first; they are
/// bounded by what the client chose to compress (small control frames).
fn feed_stdin(child: &mut Child, body: Body, gzipped: bool) -> Result<(), ApiError> {
    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| ApiError::Internal("missing git stdin".to_string()))?;

    tokio::spawn(async move {
        let mut stream = body.into_data_stream();
        if gzipped {
            let mut compressed = Vec::new();
            while let Some(Ok(chunk)) = stream.next().await {
                compressed.extend_from_slice(&chunk);
            }
            match gunzip(&compressed) {
                Ok(decoded) => {
                    let _ = stdin.write_all(&decoded).await;
                }
                Err(e) => tracing::debug!(error = %e, "bad gzip request body"),
            }
        } else {
            while let Some(chunk) = stream.next().await {
                let Ok(chunk) = chunk else { break };
                if stdin.write_all(&chunk).await.is_err() {
                    break;
                }
            }
        }
        let _ = stdin.shutdown().await;
    });
    Ok(())
}

/// `GET /:owner/:repo[.git]/info/refs?service=…` — ref discovery.
pub async fn info_refs(
    State(state): State<AppState>,
    Path((owner, repo)): Path<(String, String)>,
    Query(query): Query<InfoRefsQuery>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let service = query
        .service
        .as_deref()
        .and_then(GitService::from_str)
        .ok_or_else(|| ApiError::BadRequest("unknown or missing service".to_string()))?;

    let repo_path = repo_dir(&state, &owner, &repo)?;
    let mut child = spawn_git(&repo_path, service, true, &headers)?;
    drop(child.stdin.take());
    drain_stderr(&mut child, service);
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| ApiError::Internal("missing git stdout".to_string()))?;

    // The service preamble precedes the child's advertisement on the wire.
    let mut preamble = pkt_line(&format!("# service={}\n", service.as_str()));
    preamble.extend(pkt_flush());
    let reader = tokio::io::AsyncReadExt::chain(std::io::Cursor::new(preamble), stdout);

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, service.advertisement_content_type()),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        git_body(reader, child),
    )
        .into_response())
}

/// `POST /:owner/:repo[.git]/git-upload-pack` — fetch/clone.
pub async fn upload_pack(
    State(state): State<AppState>,
    Path((owner, repo)): Path<(String, String)>,
    headers: HeaderMap,
    body: Body,
) -> Result<Response, ApiError> {
    exchange(state, owner, repo, GitService::UploadPack, headers, body).await
}

/// `POST /:owner/:repo[.git]/git-receive-pack` — push.
///
/// Whether the push lands depends on the repository (bare, or configured
/// with `receive.denyCurrentBranch = updateInstead`); git itself enforces
/// that and reports the outcome in-band.
pub async fn receive_pack(
    State(state): State<AppState>,
    Path((owner, repo)): Path<(String, String)>,
    headers: HeaderMap,
    body: Body,
) -> Result<Response, ApiError> {
    exchange(state, owner, repo, GitService::ReceivePack, headers, body).await
}

async fn exchange(
    state: AppState,
    owner: String,
    repo: String,
    service: GitService,
    headers: HeaderMap,
    body: Body,
) -> Result<Response, ApiError> {
    let repo_path = repo_dir(&state, &owner, &repo)?;
    let mut child = spawn_git(&repo_path, service, false, &headers)?;

    feed_stdin(&mut child, body, is_gzip(&headers))?;
    drain_stderr(&mut child, service);
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| ApiError::Internal("missing git stdout".to_string()))?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, service.result_content_type()),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        git_body(stdout, child),
    )
        .into_response())
}
