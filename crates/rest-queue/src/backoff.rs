//! Exponential backoff for transient delivery failures.

use std::time::Duration;

/// Default first retry delay.
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(500);

/// Default ceiling. Once the backoff reaches it, the request is given up.
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(600);

/// Smallest first wait. A zero wait would never double towards the ceiling.
const MIN_BACKOFF: Duration = Duration::from_millis(1);

/// Backoff parameters shared by every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub max: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial: DEFAULT_INITIAL_BACKOFF,
            max: DEFAULT_MAX_BACKOFF,
        }
    }
}

impl BackoffPolicy {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self { initial, max }
    }

    /// Fresh per-request backoff state. `initial` is raised to at least 1ms
    /// so the ceiling is always reached.
    pub fn start(&self) -> Backoff {
        Backoff {
            current: self.initial.max(MIN_BACKOFF),
            max: self.max,
        }
    }
}

/// Backoff state for one request. Doubles after every wait.
///
/// The ceiling is hard: a wait is only handed out while the current value is
/// below `max`, and after the wait the doubled value is checked again. With
/// 0.5s/600s that is 11 attempts with waits of 0.5s, 1s, ... 512s, the last
/// wait ending in give-up (about 17 minutes in total).
#[derive(Debug, Clone)]
pub struct Backoff {
    current: Duration,
    max: Duration,
}

impl Backoff {
    /// Wait before the next attempt, or `None` if the ceiling is reached.
    pub fn next_wait(&mut self) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }
        let wait = self.current;
        self.current = self.current.saturating_mul(2);
        Some(wait)
    }

    /// The ceiling has been reached; no further attempts.
    pub fn is_exhausted(&self) -> bool {
        self.current >= self.max
    }

    pub fn current(&self) -> Duration {
        self.current
    }
}
