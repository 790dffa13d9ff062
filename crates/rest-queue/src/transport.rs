//! HTTP transport.

use crate::{DeliveryRequest, DeliveryResponse, Method, QueueResult};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::debug;

/// Performs a single delivery attempt. Never retries; the queue does that.
///
/// Failures are reported through [`DeliveryResponse`], not `Err`, so the
/// queue can classify them.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &DeliveryRequest) -> DeliveryResponse;

    /// Blocking variant used by the synchronous flush. Must not be called
    /// from inside an async runtime.
    fn send_blocking(&self, request: &DeliveryRequest) -> DeliveryResponse;
}

/// reqwest-backed transport.
pub struct HttpTransport {
    client: reqwest::Client,
    // Built on first use: constructing a blocking client inside a runtime panics.
    blocking: OnceLock<reqwest::blocking::Client>,
    timeout: Duration,
    content_type: String,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> QueueResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            blocking: OnceLock::new(),
            timeout,
            content_type: "application/json".to_string(),
        })
    }

    /// Content-Type sent with request bodies (default `application/json`).
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    fn blocking_client(&self) -> Result<&reqwest::blocking::Client, reqwest::Error> {
        if let Some(client) = self.blocking.get() {
            return Ok(client);
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()?;
        Ok(self.blocking.get_or_init(|| client))
    }
}

fn http_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &DeliveryRequest) -> DeliveryResponse {
        debug!(method = %request.method, url = %request.url, "Sending request");

        let mut builder = self
            .client
            .request(http_method(request.method), &request.url);
        if let Some(body) = &request.body {
            builder = builder
                .header(CONTENT_TYPE, &self.content_type)
                .body(body.clone());
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => return DeliveryResponse::network_failure(e.to_string()),
        };

        let status = response.status().as_u16();
        match response.bytes().await {
            Ok(body) => DeliveryResponse::http(status, body.to_vec()),
            Err(e) => DeliveryResponse::network_failure(e.to_string()),
        }
    }

    fn send_blocking(&self, request: &DeliveryRequest) -> DeliveryResponse {
        debug!(method = %request.method, url = %request.url, "Sending request (blocking)");

        let client = match self.blocking_client() {
            Ok(client) => client,
            Err(e) => return DeliveryResponse::network_failure(e.to_string()),
        };

        let mut builder = client.request(http_method(request.method), &request.url);
        if let Some(body) = &request.body {
            builder = builder
                .header(CONTENT_TYPE, &self.content_type)
                .body(body.clone());
        }

        let response = match builder.send() {
            Ok(response) => response,
            Err(e) => return DeliveryResponse::network_failure(e.to_string()),
        };

        let status = response.status().as_u16();
        match response.bytes() {
            Ok(body) => DeliveryResponse::http(status, body.to_vec()),
            Err(e) => DeliveryResponse::network_failure(e.to_string()),
        }
    }
}
