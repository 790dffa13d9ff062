//! Blocking flush tests. These run outside any async runtime, the way the
//! flush is used at shutdown.

use super::harness::{get, test_config, url, FixedClock, Reply, StubTransport};
use crate::{BackoffPolicy, QueueConfig, RequestQueue};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn blocking_queue(config: QueueConfig) -> (RequestQueue, Arc<StubTransport>) {
    let transport = StubTransport::new();
    let queue = RequestQueue::with_clock(config, transport.clone(), Arc::new(FixedClock));
    (queue, transport)
}

fn short_backoff() -> QueueConfig {
    QueueConfig {
        backoff: BackoffPolicy::new(Duration::from_millis(10), Duration::from_millis(80)),
        ..test_config()
    }
}

#[test]
fn test_flush_completes_every_pending_request_in_order() {
    let (queue, transport) = blocking_queue(short_backoff());
    transport.push(Reply::network_error());
    transport.push(Reply::status(200));
    transport.push(Reply::status(404));

    queue.enqueue(get("first"));
    queue.enqueue(get("second"));

    let started = Instant::now();
    assert_eq!(queue.process_immediate().unwrap(), 2);
    assert!(started.elapsed() >= Duration::from_millis(10));

    assert_eq!(
        transport.attempt_urls(),
        vec![url("first"), url("first"), url("second")]
    );
    let statuses: Vec<Option<u16>> = queue
        .history()
        .iter()
        .map(|r| r.response().and_then(|resp| resp.status))
        .collect();
    assert_eq!(statuses, vec![Some(200), Some(404)]);
    assert_eq!(queue.pending_len(), 0);
    assert!(!queue.is_processing());
}

#[test]
fn test_flush_gives_up_at_max_backoff() {
    let (queue, transport) = blocking_queue(short_backoff());
    transport.set_default(Reply::status(500));
    queue.enqueue(get("down"));

    assert_eq!(queue.process_immediate().unwrap(), 1);

    // Waits of 10, 20 and 40ms; the 40ms wait hits the 80ms ceiling.
    assert_eq!(transport.attempts().len(), 3);
    let record = &queue.history()[0];
    assert_eq!(record.response().and_then(|r| r.status), Some(500));
    assert_eq!(record.attempts(), 3);
}

#[test]
fn test_flush_with_zero_initial_backoff_gives_up() {
    let config = QueueConfig {
        backoff: BackoffPolicy::new(Duration::ZERO, Duration::from_millis(8)),
        ..test_config()
    };
    let (queue, transport) = blocking_queue(config);
    transport.set_default(Reply::status(500));
    queue.enqueue(get("down"));

    assert_eq!(queue.process_immediate().unwrap(), 1);

    // Waits of 1, 2 and 4ms before the ceiling.
    assert_eq!(transport.attempts().len(), 3);
    assert_eq!(queue.history()[0].attempts(), 3);
    assert_eq!(queue.pending_len(), 0);
}

#[test]
fn test_flush_of_empty_queue_is_a_no_op() {
    let (queue, transport) = blocking_queue(test_config());
    assert_eq!(queue.process_immediate().unwrap(), 0);
    assert!(transport.attempts().is_empty());
}

#[test]
fn test_flush_writes_final_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let config = QueueConfig {
        snapshot_path: Some(dir.path().join("rest_queue.session")),
        ..short_backoff()
    };
    let (queue, _transport) = blocking_queue(config);
    queue.enqueue(get("Configuration"));

    queue.process_immediate().unwrap();

    let bytes = std::fs::read(dir.path().join("rest_queue.session")).unwrap();
    let snapshot = crate::decode_snapshot(&bytes).unwrap();
    assert!(snapshot.pending_requests.is_empty());
    assert_eq!(snapshot.past_requests.len(), 1);
}
