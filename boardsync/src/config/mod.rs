//! Configuration for the BoardSync client.
//!
//! Layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/boardsync/config.toml`)
//! 4. Compiled defaults
//!
//! A missing default config file is not an error (defaults apply). An
//! explicit `--config` path that doesn't exist is an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::conn::ReconnectConfig;
use crate::session::Role;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),

    /// A required setting is absent from every layer.
    #[error("missing required setting: {0}")]
    Missing(&'static str),
}

/// CLI arguments, also read from the environment.
#[derive(Debug, Default, clap::Parser)]
#[command(name = "boardsync", about = "Headless board synchronization client")]
pub struct CliArgs {
    /// Path to a TOML config file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Base URL of the dashboard API server.
    #[arg(long, env = "BOARDSYNC_API_URL")]
    pub api_url: Option<String>,

    /// WebSocket URL of the push endpoint (derived from the API URL when
    /// unset).
    #[arg(long, env = "BOARDSYNC_PUSH_URL")]
    pub push_url: Option<String>,

    /// Bearer credential for both channels.
    #[arg(long, env = "BOARDSYNC_TOKEN")]
    pub token: Option<String>,

    /// Team whose room to join.
    #[arg(long)]
    pub team: Option<String>,

    /// Project whose board to open.
    #[arg(long)]
    pub project: Option<String>,

    /// The authenticated user's id, for assignment matching.
    #[arg(long, env = "BOARDSYNC_USER_ID")]
    pub user_id: Option<String>,

    /// The authenticated user's email, the assignment-matching fallback.
    #[arg(long, env = "BOARDSYNC_EMAIL")]
    pub email: Option<String>,

    /// The authenticated user's role (ADMIN, MANAGER, or MEMBER), which
    /// gates what the board shows.
    #[arg(long, env = "BOARDSYNC_ROLE")]
    pub role: Option<Role>,

    /// Log file path; logs go to stderr when unset.
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Default log filter when `RUST_LOG` is unset.
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    server: ServerFileConfig,
    session: SessionFileConfig,
    reconnect: ReconnectFileConfig,
}

/// `[server]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ServerFileConfig {
    api_url: Option<String>,
    push_url: Option<String>,
}

/// `[session]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct SessionFileConfig {
    token: Option<String>,
    user_id: Option<String>,
    email: Option<String>,
    role: Option<Role>,
    team: Option<String>,
    project: Option<String>,
}

/// `[reconnect]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ReconnectFileConfig {
    max_attempts: Option<u32>,
    initial_delay_ms: Option<u64>,
    max_delay_ms: Option<u64>,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Fully resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the dashboard API.
    pub api_url: Option<String>,
    /// Push endpoint URL; derived from `api_url` when unset.
    pub push_url: Option<String>,
    /// Bearer credential for both channels.
    pub token: Option<String>,
    /// Team whose room to join at startup.
    pub team: Option<String>,
    /// Project whose board to open at startup.
    pub project: Option<String>,
    /// The authenticated user's id.
    pub user_id: Option<String>,
    /// The authenticated user's email.
    pub email: Option<String>,
    /// The authenticated user's role. Defaults to the least-privileged
    /// one when no layer sets it.
    pub role: Role,
    /// Push-channel reconnect policy.
    pub reconnect: ReconnectConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            push_url: None,
            token: None,
            team: None,
            project: None,
            user_id: None,
            email: None,
            role: Role::Member,
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an explicit config file cannot be read
    /// or parsed.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, &file))
    }

    /// Resolve a `ClientConfig` from CLI args and a parsed config file.
    ///
    /// Priority: CLI > file > default. Separated from `load()` so it can
    /// be unit tested without touching the filesystem.
    #[must_use]
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Self {
        let defaults = ReconnectConfig::default();
        Self {
            api_url: cli.api_url.clone().or_else(|| file.server.api_url.clone()),
            push_url: cli
                .push_url
                .clone()
                .or_else(|| file.server.push_url.clone()),
            token: cli.token.clone().or_else(|| file.session.token.clone()),
            team: cli.team.clone().or_else(|| file.session.team.clone()),
            project: cli.project.clone().or_else(|| file.session.project.clone()),
            user_id: cli.user_id.clone().or_else(|| file.session.user_id.clone()),
            email: cli.email.clone().or_else(|| file.session.email.clone()),
            role: cli.role.or(file.session.role).unwrap_or(Role::Member),
            reconnect: ReconnectConfig {
                max_attempts: file
                    .reconnect
                    .max_attempts
                    .unwrap_or(defaults.max_attempts),
                initial_delay: file
                    .reconnect
                    .initial_delay_ms
                    .map_or(defaults.initial_delay, Duration::from_millis),
                max_delay: file
                    .reconnect
                    .max_delay_ms
                    .map_or(defaults.max_delay, Duration::from_millis),
            },
        }
    }

    /// The push endpoint to dial: the configured `push_url`, or one
    /// derived from the API base URL (scheme swapped to ws/wss, trailing
    /// `/api` stripped, `/push` appended).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] if neither URL is configured.
    pub fn push_endpoint(&self) -> Result<String, ConfigError> {
        if let Some(url) = &self.push_url {
            return Ok(url.clone());
        }
        let api = self
            .api_url
            .as_deref()
            .ok_or(ConfigError::Missing("server.api_url"))?;
        Ok(derive_push_url(api))
    }
}

/// Derives a push endpoint from an API base URL.
fn derive_push_url(api_url: &str) -> String {
    let base = api_url.trim_end_matches('/');
    let base = base.strip_suffix("/api").unwrap_or(base);
    let swapped = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base.to_string()
    };
    format!("{swapped}/push")
}

/// Loads the TOML config file.
///
/// With an explicit path, read errors are fatal. Without one, the
/// default path is tried and silently skipped when absent.
fn load_config_file(explicit: Option<&Path>) -> Result<ConfigFile, ConfigError> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => {
            let Some(dir) = dirs::config_dir() else {
                return Ok(ConfigFile::default());
            };
            let default_path = dir.join("boardsync").join("config.toml");
            if !default_path.exists() {
                return Ok(ConfigFile::default());
            }
            default_path
        }
    };

    let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::ReadFile {
        path: path.clone(),
        source,
    })?;
    Ok(toml::from_str(&contents)?)
}
