//! Durable, ordered outbound REST request queue.
//!
//! This crate provides:
//! - RequestRecord: one queued HTTP operation and its eventual outcome
//! - RequestQueue: FIFO engine draining one request at a time with
//!   exponential backoff on transient failures
//! - Snapshot codec: compressed forensic snapshots of the whole queue state
//! - HttpTransport: reqwest-backed transport with async and blocking paths
//!
//! # Delivery rules
//!
//! 1. **Strict FIFO**: requests are attempted in enqueue order.
//! 2. **One in flight**: request N+1 is never attempted before N is terminal.
//! 3. **Transient failures retry**: network errors, 5xx and 408 back off and
//!    retry until the backoff ceiling is reached.
//! 4. **Everything else is terminal**: other statuses (including 4xx) are
//!    stored as the final response without retry.

mod backoff;
mod clock;
mod config;
mod engine;
mod error;
mod record;
mod response;
mod snapshot;
mod transport;

#[cfg(test)]
mod tests;

pub use backoff::{Backoff, BackoffPolicy};
pub use clock::{Clock, SystemClock};
pub use config::QueueConfig;
pub use engine::{QueueStatus, RequestQueue};
pub use error::{QueueError, QueueResult};
pub use record::{Method, RequestRecord};
pub use response::{DeliveryRequest, DeliveryResponse};
pub use snapshot::{
    decode_snapshot, CompressionLevel, PersistedRequest, SessionInfo, SessionSnapshot,
};
pub use transport::{HttpTransport, Transport};
