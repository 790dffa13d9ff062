//! Logging initialization.
//!
//! Thin wrapper over the observability crate: JSONL under `<base>/logs` plus
//! compact stderr output.

use crate::Paths;

/// Initialize logging for `service_name` at `level`.
///
/// `RUST_LOG` still overrides the level, as with every PlayUR service.
pub fn init_logging(service_name: &str, level: &str, paths: &Paths) {
    observability::init_with_config(observability::LogConfig {
        service_name: service_name.into(),
        default_level: level.into(),
        log_path: Some(paths.log_file(service_name)),
        also_stderr: true,
    });
}

/// Parse a log level string into a tracing Level.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}
