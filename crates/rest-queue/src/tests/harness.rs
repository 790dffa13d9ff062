//! Test harness for queue engine tests.
//!
//! Provides:
//! - StubTransport: replays scripted replies and records every attempt
//! - PausedClock: wall clock driven by tokio's (paused) virtual time
//! - FixedClock: a clock that never moves

use crate::{
    Clock, DeliveryRequest, DeliveryResponse, Method, QueueConfig, RequestQueue, RequestRecord,
    Transport,
};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;

/// Scripted transport behaviour for one attempt.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub enum Reply {
    Respond(DeliveryResponse),
    /// Respond after a (virtual) delay
    Delayed(Duration, DeliveryResponse),
    /// Never complete
    Hang,
}

impl Reply {
    pub fn status(status: u16) -> Self {
        Reply::Respond(DeliveryResponse::http(status, Vec::new()))
    }

    pub fn network_error() -> Self {
        Reply::Respond(DeliveryResponse::network_failure("connection refused"))
    }
}

/// One attempt seen by the stub.
#[derive(Debug, Clone)]
pub struct Attempt {
    pub method: Method,
    pub url: String,
    pub at: Instant,
}

pub struct StubTransport {
    script: Mutex<VecDeque<Reply>>,
    default_reply: Mutex<Reply>,
    attempts: Mutex<Vec<Attempt>>,
}

impl StubTransport {
    /// Replies 200 unless scripted otherwise.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            default_reply: Mutex::new(Reply::status(200)),
            attempts: Mutex::new(Vec::new()),
        })
    }

    pub fn push(&self, reply: Reply) {
        self.script.lock().unwrap().push_back(reply);
    }

    pub fn set_default(&self, reply: Reply) {
        *self.default_reply.lock().unwrap() = reply;
    }

    pub fn attempts(&self) -> Vec<Attempt> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn attempt_urls(&self) -> Vec<String> {
        self.attempts().into_iter().map(|a| a.url).collect()
    }

    /// Gaps between consecutive attempts.
    pub fn gaps(&self) -> Vec<Duration> {
        self.attempts()
            .windows(2)
            .map(|pair| pair[1].at - pair[0].at)
            .collect()
    }

    fn next(&self, request: &DeliveryRequest) -> Reply {
        self.attempts.lock().unwrap().push(Attempt {
            method: request.method,
            url: request.url.clone(),
            at: Instant::now(),
        });
        let scripted = self.script.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| self.default_reply.lock().unwrap().clone())
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn send(&self, request: &DeliveryRequest) -> DeliveryResponse {
        match self.next(request) {
            Reply::Respond(response) => response,
            Reply::Delayed(delay, response) => {
                tokio::time::sleep(delay).await;
                response
            }
            Reply::Hang => std::future::pending().await,
        }
    }

    fn send_blocking(&self, request: &DeliveryRequest) -> DeliveryResponse {
        match self.next(request) {
            Reply::Respond(response) => response,
            Reply::Delayed(delay, response) => {
                std::thread::sleep(delay);
                response
            }
            Reply::Hang => DeliveryResponse::network_failure("stub cannot hang a blocking call"),
        }
    }
}

fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
}

/// Wall clock that advances with tokio's virtual time.
pub struct PausedClock {
    origin_wall: DateTime<Utc>,
    origin: Instant,
}

impl PausedClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            origin_wall: epoch(),
            origin: Instant::now(),
        })
    }
}

impl Clock for PausedClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(Instant::now() - self.origin)
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.origin_wall + elapsed
    }
}

/// Clock frozen at a single instant.
pub struct FixedClock;

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        epoch()
    }
}

pub const SERVER_URL: &str = "https://playur.test/api/";

pub fn test_config() -> QueueConfig {
    QueueConfig {
        server_url: SERVER_URL.to_string(),
        ..QueueConfig::default()
    }
}

/// Queue on virtual time with a stub transport.
pub fn paused_queue(config: QueueConfig) -> (Arc<RequestQueue>, Arc<StubTransport>) {
    let transport = StubTransport::new();
    let queue = Arc::new(RequestQueue::with_clock(
        config,
        transport.clone(),
        PausedClock::new(),
    ));
    (queue, transport)
}

pub fn get(endpoint: &str) -> RequestRecord {
    RequestRecord::for_endpoint(Method::Get, endpoint)
}

pub fn url(endpoint: &str) -> String {
    format!("{}{}", SERVER_URL, endpoint)
}

/// Next `RequestFinished` event, failing the test after an hour of virtual time.
pub async fn next_finished(rx: &mut broadcast::Receiver<RequestRecord>) -> RequestRecord {
    tokio::time::timeout(Duration::from_secs(3600), rx.recv())
        .await
        .expect("no request finished within an hour")
        .expect("finished channel closed")
}

/// `actual` is `expected` give or take timer granularity.
pub fn assert_close(actual: Duration, expected: Duration) {
    assert!(
        actual >= expected && actual < expected + Duration::from_millis(50),
        "expected ~{:?}, got {:?}",
        expected,
        actual
    );
}
