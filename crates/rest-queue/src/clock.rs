//! Wall clock used for request timestamps.

use chrono::{DateTime, Utc};

/// Source of timestamps for `submitted_at`, `requested_at` and snapshots.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
