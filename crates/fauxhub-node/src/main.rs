//! FauxHub - a local GitHub stand-in.
//!
//! Serves on-disk Git repositories with GitHub-compatible request shapes:
//! raw files, the object-level REST APIs, codeload archives, and the Git
//! Smart HTTP transfer protocol.
//!
//! ## Configuration
//!
//! Configured via a TOML file, environment variables, or command-line
//! arguments (in increasing precedence):
//!
//! - `FAUXHUB_REPO_ROOT` - directory holding `owner/repo` repositories
//! - `FAUXHUB_HTTP_PORT` - HTTP listen port
//! - `FAUXHUB_HTTPS_PORT` - HTTPS listen port
//! - `FAUXHUB_LOG_LEVEL` - log level (default: info)
//! - `FAUXHUB_LOG_FORMAT` - log format: json or pretty

use std::path::PathBuf;

use clap::Parser;
use fauxhub_node::config::NodeConfig;
use fauxhub_node::observability::{init_logging, LogFormat};
use fauxhub_node::server::Server;

/// FauxHub - GitHub-compatible server for local Git repositories
#[derive(Parser, Debug)]
#[command(name = "fauxhub-node")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "fauxhub.toml")]
    config: PathBuf,

    /// Repository root directory (overrides config file and env)
    #[arg(long)]
    repo_root: Option<PathBuf>,

    /// HTTP listen port
    #[arg(long)]
    http_port: Option<u16>,

    /// HTTPS listen port
    #[arg(long)]
    https_port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Log format (json, pretty)
    #[arg(long)]
    log_format: Option<String>,

    /// Run in local development mode (uses pretty logging)
    #[arg(long)]
    local: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = if args.config.exists() {
        NodeConfig::from_file(&args.config).unwrap_or_else(|e| {
            eprintln!("Warning: Failed to load config file: {}. Using defaults.", e);
            NodeConfig::default()
        })
    } else {
        NodeConfig::default()
    };

    // Merge environment variables
    if let Err(e) = config.merge_env() {
        eprintln!("Warning: Failed to merge environment config: {}", e);
    }

    // Override with CLI arguments
    if let Some(root) = args.repo_root {
        config.repo_root = root;
    }
    if let Some(port) = args.http_port {
        config.listen.http.port = port;
    }
    if let Some(port) = args.https_port {
        config
            .listen
            .https
            .get_or_insert_with(Default::default)
            .port = port;
    }
    if let Some(level) = args.log_level {
        config.logs.level = level;
    }
    if let Some(format) = args.log_format {
        config.logs.format = format;
    }
    if args.local {
        config.logs.format = "pretty".to_string();
    }

    // Validate configuration
    if let Err(e) = config.validate_config() {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    }

    // Initialize logging
    let json_format = LogFormat::parse(&config.logs.format) == LogFormat::Json;
    init_logging(&config.logs.level, json_format);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting FauxHub");
    tracing::info!(
        repo_root = %config.repo_root.display(),
        http = %format!("{}:{}", config.listen.http.host, config.listen.http.port),
        https_enabled = config.listen.https.is_some(),
        subdomain_mapping = config.subdomain_mapping.enable,
        "Server configuration"
    );

    let handle = Server::new(config).start().await?;

    tracing::info!(
        http_port = handle.http_port,
        https_port = handle.https_port,
        "FauxHub ready to accept connections"
    );

    handle.wait().await;

    tracing::info!("FauxHub stopped");
    Ok(())
}
