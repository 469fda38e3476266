//! Server configuration.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use fauxhub_git::RepoResolver;
use serde::{Deserialize, Serialize};

/// Top-level configuration, immutable per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Title shown on the HTML stub pages.
    pub app_title: String,
    /// Directory under which `owner/repo` directories live.
    pub repo_root: PathBuf,
    /// Logical repositories mounted at arbitrary paths, trusted verbatim.
    pub virtual_repos: HashMap<String, HashMap<String, VirtualRepoConfig>>,
    /// Listener configuration.
    pub listen: ListenConfig,
    /// Host-header to path-prefix mapping.
    pub subdomain_mapping: SubdomainConfig,
    /// Logging configuration.
    pub logs: LogConfig,
}

/// A virtual repository mount.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualRepoConfig {
    /// Absolute path of the repository.
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenConfig {
    /// Plain HTTP listener (required).
    pub http: HttpListenConfig,
    /// TLS listener; absent means HTTPS is disabled.
    pub https: Option<HttpsListenConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpListenConfig {
    pub host: String,
    /// Port to bind; `0` binds an ephemeral port.
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpsListenConfig {
    pub host: String,
    pub port: u16,
    /// PEM key path. When key or cert is missing a self-signed pair is
    /// generated at startup.
    pub key: Option<PathBuf>,
    /// PEM certificate path.
    pub cert: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubdomainConfig {
    pub enable: bool,
    /// Suffixes like `localtest.me`; the leading subdomain part becomes a
    /// path prefix.
    pub base_domains: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// trace, debug, info, warn, error.
    pub level: String,
    /// json or pretty.
    pub format: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            app_title: "FauxHub".to_string(),
            repo_root: PathBuf::from("./repos"),
            virtual_repos: HashMap::new(),
            listen: ListenConfig::default(),
            subdomain_mapping: SubdomainConfig::default(),
            logs: LogConfig::default(),
        }
    }
}

impl Default for HttpListenConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl Default for HttpsListenConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3443,
            key: None,
            cert: None,
        }
    }
}

impl Default for SubdomainConfig {
    fn default() -> Self {
        Self {
            enable: false,
            base_domains: Vec::new(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl NodeConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: NodeConfig =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Saves configuration to a TOML file.
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Merges `FAUXHUB_*` environment variables over the current values.
    pub fn merge_env(&mut self) -> Result<()> {
        if let Ok(root) = std::env::var("FAUXHUB_REPO_ROOT") {
            self.repo_root = PathBuf::from(root);
        }
        if let Ok(port) = std::env::var("FAUXHUB_HTTP_PORT") {
            self.listen.http.port = port.parse().context("FAUXHUB_HTTP_PORT")?;
        }
        if let Ok(port) = std::env::var("FAUXHUB_HTTPS_PORT") {
            let parsed = port.parse().context("FAUXHUB_HTTPS_PORT")?;
            self.listen
                .https
                .get_or_insert_with(HttpsListenConfig::default)
                .port = parsed;
        }
        if let Ok(level) = std::env::var("FAUXHUB_LOG_LEVEL") {
            self.logs.level = level;
        }
        if let Ok(format) = std::env::var("FAUXHUB_LOG_FORMAT") {
            self.logs.format = format;
        }
        Ok(())
    }

    /// Rejects configurations the server cannot start with.
    pub fn validate_config(&self) -> Result<()> {
        if self.repo_root.as_os_str().is_empty() {
            bail!("repo_root must not be empty");
        }
        if self.subdomain_mapping.enable && self.subdomain_mapping.base_domains.is_empty() {
            bail!("subdomain_mapping.enable requires at least one base domain");
        }
        for (owner, repos) in &self.virtual_repos {
            for (name, v) in repos {
                if !v.path.is_absolute() {
                    bail!("virtual repo {owner}/{name} must use an absolute path");
                }
            }
        }
        Ok(())
    }

    /// Builds the request-time resolver from root + virtual mounts.
    pub fn build_resolver(&self) -> RepoResolver {
        let mut resolver = RepoResolver::new(&self.repo_root);
        for (owner, repos) in &self.virtual_repos {
            for (name, v) in repos {
                resolver.add_virtual(owner, name, &v.path);
            }
        }
        resolver
    }
}
