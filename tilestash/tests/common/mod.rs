//! Shared test transport for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;

use tilestash::cache::BoxFuture;
use tilestash::fetch::{
    HttpTransport, ResponseBody, TransportError, TransportRequest, TransportResponse,
};

struct StaticBody(Bytes);

impl ResponseBody for StaticBody {
    fn bytes(self: Box<Self>) -> BoxFuture<'static, Result<Bytes, TransportError>> {
        Box::pin(async move { Ok(self.0) })
    }
}

/// A tile server that answers every URL with a body derived from the URL.
///
/// It can be switched into a failing state to simulate a dead upstream
/// while the reachability signal still reports online.
#[derive(Default)]
pub struct TileServer {
    failing: AtomicBool,
    hits: AtomicUsize,
    requests: Mutex<Vec<TransportRequest>>,
    overrides: Mutex<HashMap<String, u16>>,
}

impl TileServer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Answers `url` with a bare status code.
    pub fn respond_with(&self, url: &str, status: u16) {
        self.overrides.lock().insert(url.to_string(), status);
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().clone()
    }

    pub fn body_for(url: &str) -> Vec<u8> {
        format!("tile:{}", url).into_bytes()
    }
}

impl HttpTransport for TileServer {
    fn get(
        &self,
        request: TransportRequest,
    ) -> BoxFuture<'_, Result<TransportResponse, TransportError>> {
        Box::pin(async move {
            self.requests.lock().push(request.clone());
            if self.failing.load(Ordering::SeqCst) {
                return Err(TransportError::Request("connection refused".into()));
            }
            self.hits.fetch_add(1, Ordering::SeqCst);

            if let Some(status) = self.overrides.lock().get(&request.url).copied() {
                return Ok(TransportResponse {
                    status,
                    content_type: None,
                    etag: None,
                    last_modified: None,
                    cache_control: None,
                    body: None,
                });
            }

            Ok(TransportResponse {
                status: 200,
                content_type: Some("image/png".to_string()),
                etag: Some(format!("\"{}\"", request.url.len())),
                last_modified: None,
                cache_control: None,
                body: Some(Box::new(StaticBody(Bytes::from(Self::body_for(&request.url))))),
            })
        })
    }
}
