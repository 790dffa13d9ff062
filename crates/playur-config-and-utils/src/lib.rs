//! Configuration, paths, and logging setup for PlayUR REST queue services.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{
    Config, DEFAULT_HISTORY_CAPACITY, DEFAULT_IDLE_POLL_INTERVAL_MS, DEFAULT_INITIAL_BACKOFF_MS,
    DEFAULT_LOG_LEVEL, DEFAULT_MAX_BACKOFF_MS, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SERVER_URL,
    DEFAULT_SNAPSHOT_FILE_NAME,
};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, parse_level};
pub use paths::Paths;
