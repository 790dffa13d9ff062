//! Behaviour tests for the request queue engine.
//!
//! - `harness.rs`     - scripted transport, virtual-time clock, queue builders
//! - `ordering.rs`    - FIFO delivery and order numbers
//! - `retry.rs`       - transient failures, backoff doubling, give-up
//! - `non_retry.rs`   - terminal statuses are attempted once
//! - `in_flight.rs`   - one request at a time, stop/claim semantics
//! - `persistence.rs` - snapshots written by the drain and by `save`
//! - `flush.rs`       - blocking `process_immediate`

mod flush;
pub(crate) mod harness;
mod in_flight;
mod non_retry;
