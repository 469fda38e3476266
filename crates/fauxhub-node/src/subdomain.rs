//! Host-header subdomain to path-prefix rewriting.
//!
//! `codeload.localtest.me/owner/repo/zip/main` becomes
//! `/codeload/owner/repo/zip/main` before routing. This middleware must
//! wrap the router (not be added with `Router::layer`) because it has to
//! run before route matching.

use axum::extract::{Request, State};
use axum::http::{header, Uri};
use axum::middleware::Next;
use axum::response::Response;

use crate::api::AppState;

/// Marker inserted into request extensions when the path was rewritten.
/// Handlers composing self-referential URLs substitute `localhost:<port>`
/// for the external host when this is present.
#[derive(Debug, Clone, Copy)]
pub struct SubdomainMapped;

/// Pure transform; never fails, passes through when mapping is disabled or
/// the host does not match a configured base domain.
pub async fn rewrite_request(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if state.config.subdomain_mapping.enable {
        let host = request
            .headers()
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .map(|h| h.split(':').next().unwrap_or(h).to_string());

        if let Some(host) = host {
            for base in &state.config.subdomain_mapping.base_domains {
                let Some(subdomain) = host
                    .strip_suffix(base.as_str())
                    .and_then(|s| s.strip_suffix('.'))
                else {
                    continue;
                };
                if subdomain.is_empty() {
                    break;
                }

                let mut prefix = String::new();
                for segment in subdomain.split('.') {
                    prefix.push('/');
                    prefix.push_str(segment);
                }
                let original = request
                    .uri()
                    .path_and_query()
                    .map(|pq| pq.as_str())
                    .unwrap_or("/");
                let rewritten = format!("{prefix}{original}");

                if let Ok(uri) = rewritten.parse::<Uri>() {
                    tracing::debug!(host = %host, uri = %uri, "subdomain-mapped request");
                    *request.uri_mut() = uri;
                    request.extensions_mut().insert(SubdomainMapped);
                }
                break;
            }
        }
    }

    next.run(request).await
}
