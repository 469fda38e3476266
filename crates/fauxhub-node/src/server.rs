//! Listener surface: binds HTTP (always) and HTTPS (optional), reports
//! the actual ports, and shuts down gracefully.

use anyhow::{Context, Result};
use axum_server::tls_rustls::RustlsConfig;

use crate::api::{create_app, AppState, ListenerScheme, RawObserver, RawRequestInfo};
use crate::config::{HttpsListenConfig, NodeConfig};

/// Ports the server actually bound (relevant with `port = 0`), plus the
/// running listener tasks. `https_port` is `None` when HTTPS is disabled.
pub struct ServerHandle {
    pub http_port: u16,
    pub https_port: Option<u16>,
    tasks: Vec<tokio::task::JoinHandle<()>>,
}

impl ServerHandle {
    /// Runs until every listener has stopped.
    pub async fn wait(self) {
        for task in self.tasks {
            let _ = task.await;
        }
    }
}

/// The FauxHub server, configured and ready to start.
pub struct Server {
    config: NodeConfig,
    raw_observer: Option<RawObserver>,
}

impl Server {
    pub fn new(config: NodeConfig) -> Self {
        Self {
            config,
            raw_observer: None,
        }
    }

    /// Installs a callback invoked on every raw-content request.
    pub fn with_raw_observer(
        mut self,
        observer: impl Fn(RawRequestInfo<'_>) + Send + Sync + 'static,
    ) -> Self {
        self.raw_observer = Some(std::sync::Arc::new(observer));
        self
    }

    /// Binds the listeners and starts serving.
    pub async fn start(self) -> Result<ServerHandle> {
        let state = AppState::from_config(self.config, self.raw_observer)
            .context("initializing server state")?;

        let mut tasks = Vec::new();

        // HTTP listener (required).
        let http = &state.config.listen.http;
        let listener = tokio::net::TcpListener::bind((http.host.as_str(), http.port))
            .await
            .with_context(|| format!("binding http listener on {}:{}", http.host, http.port))?;
        let http_port = listener.local_addr()?.port();

        let app = create_app(state.clone(), ListenerScheme::Http);
        tasks.push(tokio::spawn(async move {
            let serve = axum::serve(listener, app.into_make_service())
                .with_graceful_shutdown(shutdown_signal());
            if let Err(e) = serve.await {
                tracing::error!(error = %e, "HTTP server error");
            }
        }));
        tracing::info!(port = http_port, "HTTP listener bound");

        // HTTPS listener (optional).
        let mut https_port = None;
        if let Some(https) = state.config.listen.https.clone() {
            let (cert_pem, key_pem) = load_or_generate_tls(&https)?;
            let tls = RustlsConfig::from_pem(cert_pem, key_pem)
                .await
                .context("loading TLS material")?;

            let listener = std::net::TcpListener::bind((https.host.as_str(), https.port))
                .with_context(|| {
                    format!("binding https listener on {}:{}", https.host, https.port)
                })?;
            listener.set_nonblocking(true)?;
            https_port = Some(listener.local_addr()?.port());

            let app = create_app(state.clone(), ListenerScheme::Https);
            tasks.push(tokio::spawn(async move {
                let serve = axum_server::from_tcp_rustls(listener, tls).serve(app.into_make_service());
                if let Err(e) = serve.await {
                    tracing::error!(error = %e, "HTTPS server error");
                }
            }));
            tracing::info!(port = https_port, "HTTPS listener bound");
        }

        Ok(ServerHandle {
            http_port,
            https_port,
            tasks,
        })
    }
}

/// PEM cert and key from configured files, or a fresh self-signed pair
/// when either is missing.
fn load_or_generate_tls(https: &HttpsListenConfig) -> Result<(Vec<u8>, Vec<u8>)> {
    if let (Some(cert), Some(key)) = (&https.cert, &https.key) {
        let cert_pem = std::fs::read(cert).with_context(|| format!("reading {}", cert.display()))?;
        let key_pem = std::fs::read(key).with_context(|| format!("reading {}", key.display()))?;
        return Ok((cert_pem, key_pem));
    }

    tracing::warn!("no TLS key/cert configured; generating a self-signed pair");
    let certified =
        rcgen::generate_simple_self_signed(vec!["localhost".to_string(), "127.0.0.1".to_string()])
            .context("generating self-signed certificate")?;
    Ok((
        certified.cert.pem().into_bytes(),
        certified.key_pair.serialize_pem().into_bytes(),
    ))
}

/// Resolves when the process receives ctrl-c or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install CTRL+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, initiating graceful shutdown");
}
