//! Single in-flight request and drain ownership tests.

use super::harness::{get, next_finished, paused_queue, test_config, url, Reply};
use crate::{DeliveryResponse, QueueError};
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn test_hung_head_blocks_every_later_request() {
    let (queue, transport) = paused_queue(test_config());
    transport.push(Reply::Hang);

    queue.enqueue(get("stuck"));
    queue.enqueue(get("waiting"));
    let handle = queue.start_processing();

    tokio::time::sleep(Duration::from_secs(600)).await;

    assert_eq!(transport.attempt_urls(), vec![url("stuck")]);
    assert_eq!(queue.pending_len(), 2);
    assert_eq!(queue.history_len(), 0);
    assert!(queue.is_processing());

    handle.abort();
}

#[tokio::test(start_paused = true)]
async fn test_stop_waits_for_the_current_request() {
    let (queue, transport) = paused_queue(test_config());
    for _ in 0..3 {
        transport.push(Reply::Delayed(
            Duration::from_secs(1),
            DeliveryResponse::http(200, Vec::new()),
        ));
    }

    let mut rx = queue.subscribe();
    for name in ["a", "b", "c"] {
        queue.enqueue(get(name));
    }
    let handle = queue.start_processing();

    // The second request is in flight once the first has finished.
    assert_eq!(next_finished(&mut rx).await.order(), 0);
    queue.stop_processing();
    assert!(!queue.is_processing());

    handle.await.unwrap().unwrap();

    assert_eq!(queue.history_len(), 2);
    assert_eq!(queue.pending_len(), 1);
    assert_eq!(queue.pending()[0].order(), 2);
    assert_eq!(transport.attempt_urls(), vec![url("a"), url("b")]);
}

#[tokio::test(start_paused = true)]
async fn test_second_drain_is_rejected() {
    let (queue, _transport) = paused_queue(test_config());
    let handle = queue.start_processing();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(queue.is_processing());

    let second = queue.run().await;
    assert!(matches!(second, Err(QueueError::AlreadyProcessing)));

    queue.stop_processing();
    handle.await.unwrap().unwrap();
    assert!(!queue.is_processing());
}

#[tokio::test(start_paused = true)]
async fn test_stop_right_after_start_ends_the_loop() {
    let (queue, transport) = paused_queue(test_config());
    queue.enqueue(get("never"));

    let handle = queue.start_processing();
    assert!(queue.is_processing());
    queue.stop_processing();

    let joined = tokio::time::timeout(Duration::from_secs(3600), handle).await;
    assert!(matches!(joined, Ok(Ok(Ok(())))));
    assert!(!queue.is_processing());
    assert!(transport.attempts().is_empty());
    assert_eq!(queue.pending_len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_drain_can_restart_after_stop() {
    let (queue, transport) = paused_queue(test_config());
    let mut rx = queue.subscribe();

    let handle = queue.start_processing();
    tokio::time::sleep(Duration::from_millis(10)).await;
    queue.stop_processing();
    handle.await.unwrap().unwrap();

    queue.enqueue(get("later"));
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(transport.attempts().is_empty());

    let handle = queue.start_processing();
    assert_eq!(next_finished(&mut rx).await.order(), 0);

    queue.stop_processing();
    handle.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_status_reflects_live_queue() {
    let (queue, transport) = paused_queue(test_config());
    transport.push(Reply::Hang);
    queue.enqueue(get("stuck"));
    queue.enqueue(get("next"));
    let handle = queue.start_processing();
    tokio::time::sleep(Duration::from_millis(10)).await;

    let status = queue.status();
    assert_eq!(status.pending, 2);
    assert_eq!(status.history, 0);
    assert_eq!(status.next_order, 2);
    assert!(status.processing);

    // The head is mid-attempt: stamped but not completed.
    let head = &queue.pending()[0];
    assert_eq!(head.attempts(), 1);
    assert!(head.requested_at().is_some());
    assert!(!head.is_completed());

    handle.abort();
}
