//! Request queue error types.

use thiserror::Error;

/// Request queue error type.
#[derive(Error, Debug)]
pub enum QueueError {
    /// HTTP client construction error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error (snapshot file, compression stream)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// zstd compression or decompression error
    #[error("Compression error: {0}")]
    Compression(String),

    /// Snapshot bytes could not be interpreted
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// No snapshot path configured
    #[error("Snapshot path is not configured")]
    SnapshotPathUnset,

    /// HTTP method text that is not GET, POST or PUT
    #[error("Unknown HTTP method: {0}")]
    UnknownMethod(String),

    /// Another drain (async loop or blocking flush) already owns the queue
    #[error("Request queue is already being processed")]
    AlreadyProcessing,
}

/// Result type alias using QueueError.
pub type QueueResult<T> = Result<T, QueueError>;
