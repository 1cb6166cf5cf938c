//! Transport layer for outbound page requests
//!
//! The request helpers only need one capability from the platform: send a
//! request and report how it finished. [`Transport`] is that seam; the
//! browser implementation drives an `XMLHttpRequest`.

pub mod xhr;

pub use xhr::XhrTransport;

use async_trait::async_trait;

use crate::error::{HelperError, Result};

/// HTTP method used by the helpers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

/// A fully built request, ready to hand to a [`Transport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: String,
    /// Headers in the order they are set on the transport
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl OutboundRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Look up a header by name (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// `XMLHttpRequest.readyState` values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Unsent = 0,
    Opened = 1,
    HeadersReceived = 2,
    Loading = 3,
    Done = 4,
}

impl From<u16> for ReadyState {
    fn from(value: u16) -> Self {
        match value {
            1 => ReadyState::Opened,
            2 => ReadyState::HeadersReceived,
            3 => ReadyState::Loading,
            4 => ReadyState::Done,
            _ => ReadyState::Unsent,
        }
    }
}

/// What the transport observed when it signalled completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub ready_state: ReadyState,
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    /// A finished response with the given status
    pub fn done(status: u16, body: impl Into<String>) -> Self {
        Self {
            ready_state: ReadyState::Done,
            status,
            body: body.into(),
        }
    }

    /// True only for a finished request answered with HTTP 200
    pub fn is_success(&self) -> bool {
        self.ready_state == ReadyState::Done && self.status == 200
    }

    /// The response text, if the request finished with HTTP 200
    pub fn into_body(self) -> Result<String> {
        if self.is_success() {
            return Ok(self.body);
        }
        if self.ready_state != ReadyState::Done {
            return Err(HelperError::Incomplete(self.ready_state as u16));
        }
        match self.status {
            // XHR reports status 0 for network errors and aborted requests
            0 => Err(HelperError::Transport("network error".into())),
            status => Err(HelperError::Status(status)),
        }
    }
}

/// Capability to send one request and resolve once it completes
///
/// Requests are independent: no queuing, de-duplication, timeout or retry.
#[async_trait(?Send)]
pub trait Transport {
    async fn send(&self, request: OutboundRequest) -> Result<TransportResponse>;
}
