//! Configuration management.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Default PlayUR server base URL.
pub const DEFAULT_SERVER_URL: &str = "https://playur.io/api/";

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// First retry delay after a transient failure.
pub const DEFAULT_INITIAL_BACKOFF_MS: u64 = 500;

/// Backoff ceiling; reaching it gives up on the request.
pub const DEFAULT_MAX_BACKOFF_MS: u64 = 600_000;

/// Completed requests kept in memory (and in snapshots).
pub const DEFAULT_HISTORY_CAPACITY: usize = 1024;

/// How often an idle drain loop re-checks for work.
pub const DEFAULT_IDLE_POLL_INTERVAL_MS: u64 = 100;

/// Per-attempt HTTP timeout.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Snapshot file name under the sessions directory.
pub const DEFAULT_SNAPSHOT_FILE_NAME: &str = "rest_queue.session";

/// Environment variable overriding `log_level`.
const ENV_LOG_LEVEL: &str = "PLAYUR_LOG_LEVEL";

/// Environment variable overriding `server_url`.
const ENV_SERVER_URL: &str = "PLAYUR_SERVER_URL";

/// Service configuration, stored as JSON at `<base>/config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Base URL that request endpoints are resolved against.
    pub server_url: String,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    /// `None` keeps every completed request.
    pub history_capacity: Option<usize>,
    pub idle_poll_interval_ms: u64,
    pub request_timeout_secs: u64,
    pub snapshot_file_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            server_url: DEFAULT_SERVER_URL.to_string(),
            initial_backoff_ms: DEFAULT_INITIAL_BACKOFF_MS,
            max_backoff_ms: DEFAULT_MAX_BACKOFF_MS,
            history_capacity: Some(DEFAULT_HISTORY_CAPACITY),
            idle_poll_interval_ms: DEFAULT_IDLE_POLL_INTERVAL_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            snapshot_file_name: DEFAULT_SNAPSHOT_FILE_NAME.to_string(),
        }
    }
}

impl Config {
    /// Defaults with environment overrides applied.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Load from `<base>/config.json` if present, otherwise defaults, then
    /// apply environment overrides and validate.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to `<base>/config.json`.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    /// Override fields from environment-style lookups. Empty values are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(level) = non_empty(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
        if let Some(url) = non_empty(ENV_SERVER_URL) {
            self.server_url = url;
        }
    }

    /// Reject values the queue cannot run with.
    pub fn validate(&self) -> CoreResult<()> {
        self.server_url()?;
        if self.initial_backoff_ms == 0 {
            return Err(CoreError::Config(
                "initial_backoff_ms must be greater than zero".to_string(),
            ));
        }
        if self.max_backoff_ms < self.initial_backoff_ms {
            return Err(CoreError::Config(format!(
                "max_backoff_ms ({}) is below initial_backoff_ms ({})",
                self.max_backoff_ms, self.initial_backoff_ms
            )));
        }
        if self.snapshot_file_name.trim().is_empty() {
            return Err(CoreError::Config(
                "snapshot_file_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// The server base URL, parsed.
    pub fn server_url(&self) -> CoreResult<Url> {
        Url::parse(&self.server_url).map_err(CoreError::from)
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    pub fn idle_poll_interval(&self) -> Duration {
        Duration::from_millis(self.idle_poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
