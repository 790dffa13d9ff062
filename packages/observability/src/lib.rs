//! # Observability
//!
//! Tracing setup shared by PlayUR services.
//!
//! Services call [`init_with_config`] once at startup and then use the plain
//! `tracing` macros. Every event is written as one JSON line to a log file
//! (append-only, flushed per line) and, optionally, echoed to stderr in a
//! compact human format.
//!
//! ```rust,ignore
//! observability::init_with_config(observability::LogConfig {
//!     service_name: "playur-rest".into(),
//!     default_level: "debug".into(),
//!     also_stderr: true,
//!     ..Default::default()
//! });
//! tracing::info!("ready");
//! ```

mod json_layer;
mod writer;

use std::io;
use std::path::PathBuf;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

pub use json_layer::{JsonLineLayer, LogLine};
pub use writer::{LogFileWriter, LogWriterFactory};

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service, written into every log line.
    pub service_name: String,

    /// Default filter directive (e.g. "info", "rest_queue=debug").
    /// `RUST_LOG` takes precedence when set.
    pub default_level: String,

    /// JSONL file path. Defaults to `<data dir>/playur/logs/<service>.jsonl`.
    pub log_path: Option<PathBuf>,

    /// Also emit compact logs to stderr.
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            log_path: None,
            also_stderr: false,
        }
    }
}

impl LogConfig {
    /// The file the JSON layer appends to.
    pub fn resolved_log_path(&self) -> Option<PathBuf> {
        self.log_path.clone().or_else(|| {
            dirs::data_dir().map(|dir| {
                dir.join("playur")
                    .join("logs")
                    .join(format!("{}.jsonl", self.service_name))
            })
        })
    }
}

/// Initialize logging with default settings for `service_name`.
pub fn init(service_name: &str) {
    init_with_config(LogConfig {
        service_name: service_name.into(),
        ..Default::default()
    });
}

/// Initialize logging with a custom configuration.
///
/// If the log file cannot be opened, file output is skipped and logs go to
/// stderr only. Calling this twice is harmless: the second global subscriber
/// install is ignored.
pub fn init_with_config(config: LogConfig) {
    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.default_level))
    };

    let log_path = config.resolved_log_path();
    let file_writer = log_path.as_ref().and_then(|path| match LogFileWriter::new(path) {
        Ok(writer) => Some(writer),
        Err(e) => {
            eprintln!("failed to open log file {}: {}", path.display(), e);
            None
        }
    });
    let file_layer = file_writer.map(|writer| {
        JsonLineLayer::new(config.service_name.clone(), LogWriterFactory::new(writer))
            .with_filter(filter())
    });

    // Without a file, stderr is the only sink left.
    let stderr_layer = (config.also_stderr || file_layer.is_none()).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .with_writer(io::stderr)
            .with_filter(filter())
    });

    let installed = tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .is_ok();

    if installed {
        if let Some(path) = log_path {
            tracing::debug!(log_path = %path.display(), "observability initialized");
        }
    }
}

/// Re-export tracing macros for convenience.
pub use tracing::{debug, error, info, instrument, trace, warn};

/// Re-export Level for advanced filtering.
pub use tracing::Level;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.service_name, "unknown");
        assert_eq!(config.default_level, "info");
        assert!(config.log_path.is_none());
        assert!(!config.also_stderr);
    }

    #[test]
    fn test_explicit_log_path_wins() {
        let config = LogConfig {
            service_name: "playur-rest".into(),
            log_path: Some(PathBuf::from("/tmp/playur/custom.jsonl")),
            ..Default::default()
        };
        assert_eq!(
            config.resolved_log_path(),
            Some(PathBuf::from("/tmp/playur/custom.jsonl"))
        );
    }

    #[test]
    fn test_default_log_path_uses_service_name() {
        let config = LogConfig {
            service_name: "playur-rest".into(),
            ..Default::default()
        };
        if let Some(path) = config.resolved_log_path() {
            assert!(path.ends_with("playur/logs/playur-rest.jsonl"));
        }
    }
}
