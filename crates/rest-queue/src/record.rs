//! Queued request records.

use crate::{DeliveryRequest, DeliveryResponse, QueueError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// HTTP verbs the queue can deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            _ => Err(QueueError::UnknownMethod(s.to_string())),
        }
    }
}

/// One queued HTTP operation plus its eventual outcome.
///
/// Built by the caller, handed to [`RequestQueue::enqueue`](crate::RequestQueue::enqueue)
/// and owned by the queue from then on. Everything the queue hands back
/// (events, `pending()`, `history()`) is a copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRecord {
    order: u64,
    method: Method,
    url: Option<String>,
    endpoint: Option<String>,
    body: Option<Vec<u8>>,
    submitted_at: Option<DateTime<Utc>>,
    requested_at: Option<DateTime<Utc>>,
    clear_after_completion: bool,
    cleared: bool,
    attempts: u32,
    response: Option<DeliveryResponse>,
}

impl RequestRecord {
    /// A request to an absolute URL.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self::blank(method, Some(url.into()), None)
    }

    /// A request to an endpoint relative to the queue's server base URL,
    /// resolved when the request is enqueued.
    pub fn for_endpoint(method: Method, endpoint: impl Into<String>) -> Self {
        Self::blank(method, None, Some(endpoint.into()))
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self::new(Method::Post, url).with_body(body)
    }

    pub fn put(url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self::new(Method::Put, url).with_body(body)
    }

    fn blank(method: Method, url: Option<String>, endpoint: Option<String>) -> Self {
        Self {
            order: 0,
            method,
            url,
            endpoint,
            body: None,
            submitted_at: None,
            requested_at: None,
            clear_after_completion: false,
            cleared: false,
            attempts: 0,
            response: None,
        }
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Drop the body once the request completes (large or sensitive payloads).
    pub fn clear_after_completion(mut self, clear: bool) -> Self {
        self.clear_after_completion = clear;
        self
    }

    /// Position in the queue. Meaningful once enqueued.
    pub fn order(&self) -> u64 {
        self.order
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// Absolute URL. `None` only for endpoint requests not yet enqueued.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    pub fn submitted_at(&self) -> Option<DateTime<Utc>> {
        self.submitted_at
    }

    /// Time of the most recent delivery attempt.
    pub fn requested_at(&self) -> Option<DateTime<Utc>> {
        self.requested_at
    }

    pub fn clears_after_completion(&self) -> bool {
        self.clear_after_completion
    }

    /// Whether the body has been discarded.
    pub fn cleared(&self) -> bool {
        self.cleared
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn response(&self) -> Option<&DeliveryResponse> {
        self.response.as_ref()
    }

    pub fn is_completed(&self) -> bool {
        self.response.is_some()
    }

    /// Transport-ready request for the current state of this record.
    pub fn create_delivery_request(&self) -> DeliveryRequest {
        let url = self
            .url
            .clone()
            .or_else(|| self.endpoint.clone())
            .unwrap_or_default();
        DeliveryRequest {
            method: self.method,
            url,
            body: self.body.clone(),
        }
    }

    pub(crate) fn accept(&mut self, order: u64, now: DateTime<Utc>, server_url: &str) {
        self.order = order;
        self.submitted_at = Some(now);
        if self.url.is_none() {
            if let Some(endpoint) = &self.endpoint {
                self.url = Some(resolve_url(server_url, endpoint));
            }
        }
    }

    pub(crate) fn mark_attempt(&mut self, now: DateTime<Utc>) {
        self.requested_at = Some(now);
        self.attempts += 1;
    }

    /// Store the terminal response. A record completes exactly once.
    pub(crate) fn complete(&mut self, response: DeliveryResponse) {
        debug_assert!(self.response.is_none(), "request completed twice");
        self.response = Some(response);
        if self.clear_after_completion {
            self.body = None;
            self.cleared = true;
        }
    }
}

/// Join a server base URL and an endpoint with exactly one slash.
/// Absolute endpoints are used as-is.
fn resolve_url(server_url: &str, endpoint: &str) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        return endpoint.to_string();
    }
    format!(
        "{}/{}",
        server_url.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    )
}
