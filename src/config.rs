//! Configuration loading for the shortlinkd daemon.
//!
//! Loads configuration from TOML files and/or environment variables using figment.
//! This makes the daemon container-friendly by supporting both config files
//! and environment variable overrides.
//!
//! # Configuration Sources (in order of priority, lowest to highest)
//!
//! 1. Default values (from `#[serde(default)]` attributes)
//! 2. TOML config file (if provided)
//! 3. Environment variables (prefix: `SHORTLINK_`, nested with `__`)
//!
//! # Environment Variable Naming
//!
//! - `SHORTLINK_WEB__HOST` → `web.host`
//! - `SHORTLINK_WEB__PORT` → `web.port`
//! - `SHORTLINK_PANEL__PATH` → `panel.path`
//! - `SHORTLINK_SESSION__SECRET` → `session.secret`
//! - `SHORTLINK_SESSION__COOKIE_SECURE` → `session.cookie_secure`

use anyhow::{Context, Result, bail};
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration for the daemon.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// HTTP listener settings.
    #[serde(default)]
    pub web: WebConfig,

    /// Admin panel mount path and branding.
    #[serde(default)]
    pub panel: PanelConfig,

    /// Session cookie settings. The secret has no default; it must be
    /// provided via file or environment.
    pub session: SessionConfig,

    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration.
    #[serde(default)]
    pub log: LogConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebConfig {
    /// Hostname to listen on.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    1312
}

/// Admin panel configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PanelConfig {
    /// Base path the panel is mounted under. Must start with `/` and must
    /// not end with one.
    #[serde(default = "default_panel_path")]
    pub path: String,

    /// Name shown on panel pages.
    #[serde(default = "default_panel_name")]
    pub name: String,

    /// Optional logo URL shown on the login page.
    #[serde(default)]
    pub logo: Option<String>,

    /// Directory holding the panel's static assets.
    #[serde(default = "default_assets_dir")]
    pub assets_dir: PathBuf,

    /// Maximum accepted request body size for panel routes, in bytes.
    #[serde(default = "default_upload_limit")]
    pub upload_limit_bytes: usize,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            path: default_panel_path(),
            name: default_panel_name(),
            logo: None,
            assets_dir: default_assets_dir(),
            upload_limit_bytes: default_upload_limit(),
        }
    }
}

fn default_panel_path() -> String {
    "/admin".to_string()
}

fn default_panel_name() -> String {
    "Shortlink Admin".to_string()
}

fn default_assets_dir() -> PathBuf {
    PathBuf::from("./static")
}

fn default_upload_limit() -> usize {
    16 * 1024 * 1024
}

/// Session cookie configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Cookie name.
    #[serde(default = "default_session_name")]
    pub name: String,

    /// Secret used to sign the session cookie. At least 32 bytes.
    pub secret: String,

    /// Cookie domain attribute.
    #[serde(default)]
    pub cookie_domain: Option<String>,

    /// Cookie secure flag. Enable behind TLS.
    #[serde(default)]
    pub cookie_secure: bool,

    /// Server-side session lifetime in seconds.
    #[serde(default = "default_session_ttl")]
    pub ttl_secs: u64,
}

fn default_session_name() -> String {
    "shortlink_session".to_string()
}

fn default_session_ttl() -> u64 {
    86_400
}

/// SQLite database configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    /// If not specified, defaults to `shortlinkd.db` in the data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogConfig {
    /// Log level directive (e.g. `info`, `shortlinkd=debug`).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Disable the rotating log file and log to stdout only.
    #[serde(default)]
    pub file_disabled: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_disabled: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from TOML file and environment variables.
    ///
    /// Configuration sources are merged in order (later sources override earlier):
    /// 1. TOML config file (if it exists)
    /// 2. Environment variables (prefix: `SHORTLINK_`, nested with `__`)
    pub fn load(path: &Path) -> Result<Self> {
        let mut figment = Figment::new();

        if path.exists() {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed("SHORTLINK_").split("__"));

        let config: Config = figment.extract().with_context(|| {
            format!(
                "Failed to load config from {} and environment",
                path.display()
            )
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the daemon cannot serve with.
    fn validate(&self) -> Result<()> {
        if self.session.secret.len() < 32 {
            bail!(
                "session.secret must be at least 32 bytes (got {})",
                self.session.secret.len()
            );
        }
        if !self.panel.path.starts_with('/') || self.panel.path.len() < 2 {
            bail!("panel.path must be a non-root path starting with '/'");
        }
        if self.panel.path.ends_with('/') {
            bail!("panel.path must not end with '/'");
        }
        Ok(())
    }

    /// Get the default config file path
    /// - macOS: ~/Library/Application Support/shortlinkd/config.toml
    /// - Linux: ~/.config/shortlinkd/config.toml
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("shortlinkd")
            .join("config.toml")
    }

    /// Get the default data directory (database, logs).
    /// - macOS: ~/Library/Application Support/shortlinkd/
    /// - Linux: ~/.local/share/shortlinkd/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("shortlinkd")
    }
}

/// Create a default configuration template
pub fn default_config_template() -> String {
    let data_dir = Config::default_data_dir();
    let data_dir_str = data_dir.display();

    format!(
        r#"# shortlinkd configuration
# Data directory: {data_dir_str}

[web]
host = "localhost"
port = 1312

[panel]
path = "/admin"
name = "Shortlink Admin"
# logo = "https://example.com/logo.png"
assets_dir = "./static"
# upload_limit_bytes = 16777216

[session]
name = "shortlink_session"
# Used to sign the session cookie. At least 32 bytes; keep secure!
secret = "change-me-to-a-long-random-string!!"
# cookie_domain = "example.com"
cookie_secure = false
ttl_secs = 86400

[database]
# path = "{data_dir_str}/shortlinkd.db"  # Optional, defaults to data_dir/shortlinkd.db

[log]
level = "info"
file_disabled = false
"#
    )
}
