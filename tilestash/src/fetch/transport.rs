//! HTTP transport abstraction for testability.
//!
//! The fetcher talks to the network only through [`HttpTransport`]. A
//! response hands over its body as an owned [`ResponseBody`] handle: reading
//! it consumes the handle, and every other exit path releases it by drop.

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{
    HeaderMap, CACHE_CONTROL, CONTENT_TYPE, ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH,
    LAST_MODIFIED,
};
use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::cache::{BoxFuture, CacheEntry};

/// Errors raised by the transport layer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    /// The HTTP client could not be constructed.
    #[error("Failed to create HTTP client: {0}")]
    Build(String),

    /// The request could not be sent or no response arrived.
    #[error("Request failed: {0}")]
    Request(String),

    /// The request exceeded the configured timeout.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The response body could not be read.
    #[error("Failed to read response body: {0}")]
    Body(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout(e.to_string())
        } else if e.is_body() || e.is_decode() {
            TransportError::Body(e.to_string())
        } else {
            TransportError::Request(e.to_string())
        }
    }
}

/// An outgoing tile request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    pub url: String,
    /// `Cache-Control` request header value.
    pub cache_control: String,
    pub if_none_match: Option<String>,
    pub if_modified_since: Option<String>,
}

impl TransportRequest {
    pub fn new(url: impl Into<String>, cache_control: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            cache_control: cache_control.into(),
            if_none_match: None,
            if_modified_since: None,
        }
    }

    /// Makes the request conditional on the validators of a cached entry.
    pub fn conditional(mut self, entry: Option<&CacheEntry>) -> Self {
        if let Some(entry) = entry {
            self.if_none_match = entry.etag.clone();
            self.if_modified_since = entry.last_modified.clone();
        }
        self
    }
}

/// Owned handle to an unread response body.
///
/// Reading consumes the handle. Dropping it unread releases the underlying
/// connection resources.
pub trait ResponseBody: Send {
    /// Reads the complete body.
    fn bytes(self: Box<Self>) -> BoxFuture<'static, Result<Bytes, TransportError>>;
}

/// Response metadata plus the body handle.
pub struct TransportResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    /// `Cache-Control` response header value.
    pub cache_control: Option<String>,
    /// `None` when the server sent no body.
    pub body: Option<Box<dyn ResponseBody>>,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_not_modified(&self) -> bool {
        self.status == StatusCode::NOT_MODIFIED.as_u16()
    }

    /// True if the server forbids storing this response.
    pub fn is_no_store(&self) -> bool {
        self.cache_control.as_deref().is_some_and(|value| {
            value
                .split(',')
                .any(|directive| directive.trim().eq_ignore_ascii_case("no-store"))
        })
    }
}

impl fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("content_type", &self.content_type)
            .field("etag", &self.etag)
            .field("last_modified", &self.last_modified)
            .field("cache_control", &self.cache_control)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

/// Trait for HTTP transport operations.
///
/// This abstraction allows for dependency injection and easier testing
/// by enabling mock transports in tests.
pub trait HttpTransport: Send + Sync {
    /// Performs a GET request.
    ///
    /// Non-success statuses are returned as responses, not errors; only
    /// failures to obtain a response at all are `Err`.
    fn get(
        &self,
        request: TransportRequest,
    ) -> BoxFuture<'_, Result<TransportResponse, TransportError>>;
}

/// Real transport implementation using reqwest.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport with the given request timeout and user agent.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            // Keep connections warm for batch prefetches
            .pool_max_idle_per_host(32)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(30))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| TransportError::Build(e.to_string()))?;

        Ok(Self { client })
    }

    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        trace!(url = %request.url, cache_control = %request.cache_control, "HTTP GET request starting");

        let mut builder = self
            .client
            .get(&request.url)
            .header(CACHE_CONTROL, &request.cache_control);
        if let Some(etag) = &request.if_none_match {
            builder = builder.header(IF_NONE_MATCH, etag);
        }
        if let Some(since) = &request.if_modified_since {
            builder = builder.header(IF_MODIFIED_SINCE, since);
        }

        let response = match builder.send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(
                    url = %request.url,
                    error = %e,
                    is_connect = e.is_connect(),
                    is_timeout = e.is_timeout(),
                    "HTTP request failed"
                );
                return Err(e.into());
            }
        };

        let status = response.status();
        debug!(url = %request.url, status = status.as_u16(), "HTTP response received");

        let headers = response.headers();
        let content_type = header_string(headers, CONTENT_TYPE);
        let etag = header_string(headers, ETAG);
        let last_modified = header_string(headers, LAST_MODIFIED);
        let cache_control = header_string(headers, CACHE_CONTROL);

        let bodyless = status == StatusCode::NO_CONTENT
            || status == StatusCode::NOT_MODIFIED
            || response.content_length() == Some(0);
        let body: Option<Box<dyn ResponseBody>> = if bodyless {
            None
        } else {
            Some(Box::new(ReqwestBody(response)))
        };

        Ok(TransportResponse {
            status: status.as_u16(),
            content_type,
            etag,
            last_modified,
            cache_control,
            body,
        })
    }
}

impl HttpTransport for ReqwestTransport {
    fn get(
        &self,
        request: TransportRequest,
    ) -> BoxFuture<'_, Result<TransportResponse, TransportError>> {
        Box::pin(self.send(request))
    }
}

/// Body handle backed by a live reqwest response.
struct ReqwestBody(reqwest::Response);

impl ResponseBody for ReqwestBody {
    fn bytes(self: Box<Self>) -> BoxFuture<'static, Result<Bytes, TransportError>> {
        Box::pin(async move {
            self.0
                .bytes()
                .await
                .map_err(|e| TransportError::Body(e.to_string()))
        })
    }
}

fn header_string(headers: &HeaderMap, name: reqwest::header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}
