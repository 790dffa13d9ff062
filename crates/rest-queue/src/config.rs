//! Queue configuration.

use crate::BackoffPolicy;
use std::path::PathBuf;
use std::time::Duration;

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Base URL that endpoint requests are resolved against.
    pub server_url: String,
    /// Retry backoff for transient failures.
    pub backoff: BackoffPolicy,
    /// Completed requests kept in memory. `None` keeps everything.
    pub history_capacity: Option<usize>,
    /// How often an idle drain loop re-checks for work without a wake-up.
    pub idle_poll_interval: Duration,
    /// Where snapshots are written. `None` disables on-disk snapshots.
    pub snapshot_path: Option<PathBuf>,
    /// Buffered `RequestFinished` events per subscriber.
    pub event_capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            server_url: "https://playur.io/api/".to_string(),
            backoff: BackoffPolicy::default(),
            history_capacity: Some(1024),
            idle_poll_interval: Duration::from_millis(100),
            snapshot_path: None,
            event_capacity: 256,
        }
    }
}
