//! Configuration management for shell-bridge.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file (JSON)
//! 4. Default values

use std::net::IpAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::api::ServerConfig;
use crate::cli::Args;
use crate::host::{Settings, CONFIRM_NON_DESTRUCTIVE};
use crate::pty::ShellBackend;
use crate::security::{generate_api_key, ApiKeyStore};
use crate::session::{RegistryConfig, DEFAULT_HISTORY_LINES};

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerSection,
    pub security: SecuritySection,
    pub execution: ExecutionSection,
    pub logging: LoggingSection,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

/// Security configuration section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SecuritySection {
    pub auth: AuthSection,
}

/// Authentication configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSection {
    /// Enable authentication.
    pub enabled: bool,
    /// API keys.
    pub api_keys: Vec<String>,
}

/// How commands run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionSection {
    /// Working directory for commands without `customCwd`.
    pub root: Option<PathBuf>,
    /// Ask for approval even when a command claims not to modify anything.
    pub confirm_non_destructive: bool,
    /// Approve everything without asking.
    pub auto_approve: bool,
    /// Shell for new terminals; the platform default when unset.
    pub shell: Option<String>,
    /// Attach shells to a pseudo-terminal (otherwise plain pipes).
    pub use_pty: bool,
    /// Output lines kept per terminal.
    pub output_history_lines: usize,
}

impl Default for ExecutionSection {
    fn default() -> Self {
        Self {
            root: None,
            confirm_non_destructive: false,
            auto_approve: false,
            shell: None,
            use_pty: true,
            output_history_lines: DEFAULT_HISTORY_LINES,
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level (error, warn, info, debug, trace) or a full filter.
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Json)
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_env_from<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = var("SHELL_BRIDGE_HOST") {
            self.server.host = host;
        }

        if let Some(port) = var("SHELL_BRIDGE_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }

        if let Some(key) = var("SHELL_BRIDGE_API_KEY").filter(|k| !k.is_empty()) {
            self.add_api_key(key);
        }

        if let Some(root) = var("SHELL_BRIDGE_ROOT").filter(|r| !r.is_empty()) {
            self.execution.root = Some(PathBuf::from(root));
        }

        if let Some(shell) = var("SHELL_BRIDGE_SHELL").filter(|s| !s.is_empty()) {
            self.execution.shell = Some(shell);
        }

        if let Some(level) = var("SHELL_BRIDGE_LOG_LEVEL").or_else(|| var("RUST_LOG")) {
            self.logging.level = level;
        }
    }

    /// Apply CLI argument overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(host) = args.host {
            self.server.host = host.to_string();
        }
        if let Some(port) = args.port {
            self.server.port = port;
        }

        if let Some(ref key) = args.api_key {
            self.add_api_key(key.clone());
        }
        if args.no_auth {
            self.security.auth.enabled = false;
        }

        if let Some(ref root) = args.root {
            self.execution.root = Some(root.clone());
        }
        if let Some(ref shell) = args.shell {
            self.execution.shell = Some(shell.clone());
        }
        if args.no_pty {
            self.execution.use_pty = false;
        }
        if args.confirm_all {
            self.execution.confirm_non_destructive = true;
        }
        if args.yes {
            self.execution.auto_approve = true;
        }

        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: CLI args > env vars > config file > defaults. Without a
    /// configured root, the current directory is used.
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mut config = match args.config {
            Some(ref path) => Config::from_file(path)?,
            None => Config::default(),
        };

        config.apply_env();
        config.apply_args(args);

        if config.execution.root.is_none() {
            config.execution.root = std::env::current_dir().ok();
        }

        Ok(config)
    }

    fn add_api_key(&mut self, key: String) {
        self.security.auth.enabled = true;
        if !self.security.auth.api_keys.contains(&key) {
            self.security.auth.api_keys.push(key);
        }
    }

    /// Generate a key when auth is enabled but none is configured.
    ///
    /// Returns the new key so it can be shown to the operator.
    pub fn ensure_api_key(&mut self) -> Option<String> {
        if !self.security.auth.enabled || !self.security.auth.api_keys.is_empty() {
            return None;
        }
        let key = generate_api_key();
        self.security.auth.api_keys.push(key.clone());
        Some(key)
    }

    /// Convert to ServerConfig for the API server.
    pub fn to_server_config(&self) -> Result<ServerConfig, ConfigError> {
        let host: IpAddr = self
            .server
            .host
            .parse()
            .map_err(|_| ConfigError::InvalidHost(self.server.host.clone()))?;
        Ok(ServerConfig::new(host.to_string(), self.server.port))
    }

    /// Key store enforcing the configured keys, or an open one.
    pub fn api_key_store(&self) -> ApiKeyStore {
        if self.security.auth.enabled {
            ApiKeyStore::from_keys(self.security.auth.api_keys.iter().cloned())
        } else {
            ApiKeyStore::disabled()
        }
    }

    /// How the terminal registry spawns shells.
    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            shell: self.execution.shell.clone(),
            backend: if self.execution.use_pty {
                ShellBackend::Pty
            } else {
                ShellBackend::Pipe
            },
            history_lines: self.execution.output_history_lines,
            ..RegistryConfig::default()
        }
    }

    /// Get the log level filter string.
    pub fn log_filter(&self) -> &str {
        &self.logging.level
    }
}

impl Settings for Config {
    fn get_bool(&self, key: &str, default: bool) -> bool {
        match key {
            CONFIRM_NON_DESTRUCTIVE => self.execution.confirm_non_destructive,
            _ => default,
        }
    }

    fn workspace_root(&self) -> Option<PathBuf> {
        self.execution.root.clone()
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    Io(std::io::Error),
    /// JSON parsing error.
    Json(serde_json::Error),
    /// Invalid host address.
    InvalidHost(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read config file: {}", e),
            Self::Json(e) => write!(f, "failed to parse config file: {}", e),
            Self::InvalidHost(host) => write!(f, "invalid host address: {}", host),
        }
    }
}

impl std::error::Error for ConfigError {}
