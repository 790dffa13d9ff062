//! Terminal status tests.

use super::harness::{get, next_finished, paused_queue, test_config, url, Reply};
use crate::DeliveryResponse;

#[tokio::test(start_paused = true)]
async fn test_not_found_is_attempted_once() {
    let (queue, transport) = paused_queue(test_config());
    transport.push(Reply::Respond(DeliveryResponse::http(
        404,
        b"no such game".to_vec(),
    )));

    let mut rx = queue.subscribe();
    queue.enqueue(get("Game/99"));
    let handle = queue.start_processing();

    let record = next_finished(&mut rx).await;
    assert!(record.is_completed());
    let response = record.response().unwrap();
    assert_eq!(response.status, Some(404));
    assert_eq!(response.text(), "no such game");
    assert_eq!(transport.attempts().len(), 1);

    queue.stop_processing();
    handle.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_client_errors_do_not_hold_up_the_queue() {
    let (queue, transport) = paused_queue(test_config());
    for status in [400, 401, 403, 422] {
        transport.push(Reply::status(status));
    }

    let mut rx = queue.subscribe();
    for i in 0..5 {
        queue.enqueue(get(&format!("e{}", i)));
    }
    let started = tokio::time::Instant::now();
    let handle = queue.start_processing();

    let mut statuses = Vec::new();
    for _ in 0..5 {
        let record = next_finished(&mut rx).await;
        statuses.push(record.response().and_then(|r| r.status));
    }

    assert_eq!(
        statuses,
        vec![Some(400), Some(401), Some(403), Some(422), Some(200)]
    );
    assert_eq!(transport.attempts().len(), 5);
    // No backoff waits were taken.
    assert!(started.elapsed() < std::time::Duration::from_millis(100));
    assert_eq!(transport.attempt_urls()[4], url("e4"));

    queue.stop_processing();
    handle.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_redirect_is_terminal() {
    let (queue, transport) = paused_queue(test_config());
    transport.push(Reply::status(302));

    let mut rx = queue.subscribe();
    queue.enqueue(get("Moved"));
    let handle = queue.start_processing();

    let record = next_finished(&mut rx).await;
    assert_eq!(record.response().and_then(|r| r.status), Some(302));
    assert_eq!(transport.attempts().len(), 1);

    queue.stop_processing();
    handle.await.unwrap().unwrap();
}
