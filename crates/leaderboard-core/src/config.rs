//! Configuration management for the leaderboard
//!
//! Settings are layered with the `config` crate, lowest precedence first:
//! built-in defaults, a YAML file, `BOARD__SECTION__KEY` environment
//! variables, then the legacy `API_ENDPOINT_URL` and `BOARD_SHOW_STDERR`
//! variables. Command-line flags are applied on top by the binary.

use crate::projector::{SortKey, SortOrder};
use crate::scheduler::{validate_period, DEFAULT_REFRESH_PERIOD};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "BOARD_CONFIG";

/// Legacy variable carrying the leaderboard endpoint
pub const ENDPOINT_ENV: &str = "API_ENDPOINT_URL";

/// Legacy variable toggling stderr display
pub const SHOW_STDERR_ENV: &str = "BOARD_SHOW_STDERR";

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Leaderboard endpoint settings
    pub source: SourceConfig,

    /// Refresh cadence
    pub refresh: RefreshConfig,

    /// Table rendering preferences
    pub display: DisplayConfig,

    /// Dashboard server settings
    pub server: ServerConfig,

    /// Logging settings
    pub observability: ObservabilityConfig,

    /// Database bootstrap settings
    pub database: DatabaseConfig,
}

impl Config {
    /// Load configuration from the process environment, reading `path` when
    /// given and the default file locations otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, std::env::vars().collect())
    }

    /// Load configuration against an explicit set of environment variables
    pub fn load_with_env(path: Option<&Path>, env: HashMap<String, String>) -> Result<Self> {
        let parsed = Self::load_unvalidated_with_env(path, env)?;
        parsed.validate()?;
        Ok(parsed)
    }

    /// Layer and parse configuration without checking the values, so that
    /// `config show` and `config validate` can report on a bad setup.
    pub fn load_unvalidated(path: Option<&Path>) -> Result<Self> {
        Self::load_unvalidated_with_env(path, std::env::vars().collect())
    }

    pub fn load_unvalidated_with_env(
        path: Option<&Path>,
        env: HashMap<String, String>,
    ) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Start with defaults
        builder = builder.add_source(config::Config::try_from(&Self::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path.to_path_buf()));
        } else if let Some(path) = env.get(CONFIG_ENV) {
            builder = builder.add_source(config::File::from(PathBuf::from(path)));
        } else {
            for path in Self::default_locations() {
                builder = builder.add_source(config::File::from(path).required(false));
            }
        }

        builder = builder.add_source(
            config::Environment::with_prefix("BOARD")
                .separator("__")
                .try_parsing(true)
                .source(Some(env.clone().into_iter().collect())),
        );

        if let Some(endpoint) = env.get(ENDPOINT_ENV).filter(|v| !v.trim().is_empty()) {
            builder = builder.set_override("source.endpoint_url", endpoint.trim())?;
        }
        if let Some(flag) = env.get(SHOW_STDERR_ENV) {
            builder = builder.set_override("display.show_stderr", parse_flag(flag)?)?;
        }

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Load configuration from a specific file on top of the defaults
    pub fn load_from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let builder = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?)
            .add_source(config::File::from(path));

        let parsed: Self = builder.build()?.try_deserialize()?;
        parsed.validate()?;

        Ok(parsed)
    }

    /// Files consulted when no explicit path is given
    pub fn default_locations() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("./board.yaml")];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("board").join("config.yaml"));
        }
        paths
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.source.validate()?;
        self.refresh.validate()?;
        self.display.validate()?;
        self.server.validate()?;
        self.observability.validate()?;
        self.database.validate()?;

        Ok(())
    }

    /// Period between scheduled refreshes
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh.interval_ms)
    }

    /// Timeout for one leaderboard request
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.source.request_timeout_secs)
    }

    /// Configured sort column
    pub fn sort_key(&self) -> Result<SortKey> {
        self.display.sort_by.parse().map_err(Error::config)
    }

    /// Configured sort direction
    pub fn sort_order(&self) -> SortOrder {
        if self.display.descending {
            SortOrder::Descending
        } else {
            SortOrder::Ascending
        }
    }

    /// Dashboard listen address
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.server.bind_addr.parse().map_err(|e| {
            Error::config(format!("Invalid bind address '{}': {}", self.server.bind_addr, e))
        })
    }

    /// Save configuration to a YAML file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            refresh: RefreshConfig::default(),
            display: DisplayConfig::default(),
            server: ServerConfig::default(),
            observability: ObservabilityConfig::default(),
            database: DatabaseConfig::default(),
        }
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::config(format!(
            "{} must be a boolean, got '{}'",
            SHOW_STDERR_ENV, other
        ))),
    }
}

/// Leaderboard endpoint settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Absolute URL of the leaderboard REST endpoint
    pub endpoint_url: String,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,
}

impl SourceConfig {
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.endpoint_url).map_err(|e| {
            Error::config(format!("Invalid endpoint URL '{}': {}", self.endpoint_url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::config(format!(
                "Endpoint URL must be http or https, got '{}'",
                url.scheme()
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::config("Request timeout must be > 0"));
        }
        Ok(())
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            endpoint_url: "http://localhost:8000/leaderboard".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Refresh cadence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Milliseconds between scheduled fetches
    pub interval_ms: u64,

    /// Fetch as soon as connectivity returns
    pub refetch_on_reconnect: bool,
}

impl RefreshConfig {
    pub fn validate(&self) -> Result<()> {
        validate_period(Duration::from_millis(self.interval_ms))
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_REFRESH_PERIOD.as_millis() as u64,
            refetch_on_reconnect: true,
        }
    }
}

/// Table rendering preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Show `mean ± stderr` instead of the bare mean
    pub show_stderr: bool,

    /// Column to sort by (`node`, a task name, `response_time`, `error_rate`)
    pub sort_by: String,

    /// Sort descending
    pub descending: bool,
}

impl DisplayConfig {
    pub fn validate(&self) -> Result<()> {
        self.sort_by.parse::<SortKey>().map_err(Error::config)?;
        Ok(())
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            show_stderr: false,
            sort_by: "average".to_string(),
            descending: true,
        }
    }
}

/// Dashboard server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address for `board serve`
    pub bind_addr: String,
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        self.bind_addr.parse::<SocketAddr>().map_err(|e| {
            Error::config(format!("Invalid bind address '{}': {}", self.bind_addr, e))
        })?;
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Log format (text or json)
    pub log_format: String,
}

impl ObservabilityConfig {
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.log_format.as_str(), "text" | "json") {
            return Err(Error::config(format!(
                "Log format must be 'text' or 'json', got '{}'",
                self.log_format
            )));
        }
        Ok(())
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "text".to_string(),
        }
    }
}

/// Database bootstrap settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database the evaluation pipeline writes to
    pub name: String,

    /// Replica set to initiate, if any
    pub replica_set: Option<String>,

    /// Member host of the replica set
    pub replica_host: String,
}

impl DatabaseConfig {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::config("Database name cannot be empty"));
        }
        if self.replica_set.is_some() && self.replica_host.trim().is_empty() {
            return Err(Error::config("Replica set requires a member host"));
        }
        Ok(())
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            name: "pocket-ml-testbench".to_string(),
            replica_set: Some("devRs".to_string()),
            replica_host: "mongodb:27017".to_string(),
        }
    }
}
