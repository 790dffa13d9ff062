//! Transport-facing request and response types.

use crate::Method;
use std::borrow::Cow;

/// A transport-ready request built from a [`RequestRecord`](crate::RequestRecord).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<Vec<u8>>,
}

/// Result of one delivery attempt.
///
/// `network_error` is set when no HTTP response arrived at all (DNS, connect,
/// TLS, timeout, broken body stream); `status` is then `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryResponse {
    pub status: Option<u16>,
    pub network_error: bool,
    pub error: Option<String>,
    pub body: Vec<u8>,
}

impl DeliveryResponse {
    /// A response carrying an HTTP status and body.
    pub fn http(status: u16, body: impl Into<Vec<u8>>) -> Self {
        let error = if (200..400).contains(&status) {
            None
        } else {
            Some(format!("HTTP {}", status))
        };
        Self {
            status: Some(status),
            network_error: false,
            error,
            body: body.into(),
        }
    }

    /// No response was received.
    pub fn network_failure(message: impl Into<String>) -> Self {
        Self {
            status: None,
            network_error: true,
            error: Some(message.into()),
            body: Vec::new(),
        }
    }

    /// 2xx/3xx.
    pub fn is_success(&self) -> bool {
        matches!(self.status, Some(status) if (200..400).contains(&status))
    }

    /// Network failures, 5xx and 408 are retried; everything else is final.
    pub fn is_transient(&self) -> bool {
        if self.network_error {
            return true;
        }
        match self.status {
            Some(status) => status >= 500 || status == 408,
            None => true,
        }
    }

    /// Response body as text (lossy).
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}
