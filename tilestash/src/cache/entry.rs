//! Stored tile responses.

use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use super::traits::CacheError;

/// A cached tile response.
///
/// Holds everything needed to serve the tile again and to decide whether it
/// is still fresh: the body, its content type, the server's validators and
/// the time the response was stored or last revalidated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub body: Vec<u8>,
    pub content_type: String,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub stored_at: SystemTime,
}

impl CacheEntry {
    /// Creates an entry stamped with the current time.
    pub fn new(body: impl Into<Vec<u8>>, content_type: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            content_type: content_type.into(),
            etag: None,
            last_modified: None,
            stored_at: SystemTime::now(),
        }
    }

    /// Attaches HTTP validators used for conditional revalidation.
    pub fn with_validators(mut self, etag: Option<String>, last_modified: Option<String>) -> Self {
        self.etag = etag;
        self.last_modified = last_modified;
        self
    }

    /// Overrides the storage timestamp.
    pub fn stored_at(mut self, stored_at: SystemTime) -> Self {
        self.stored_at = stored_at;
        self
    }

    /// Time since the entry was stored; zero if the clock moved backwards.
    pub fn age(&self) -> Duration {
        SystemTime::now()
            .duration_since(self.stored_at)
            .unwrap_or(Duration::ZERO)
    }

    /// Marks the entry as just revalidated.
    pub fn touch(&mut self) {
        self.stored_at = SystemTime::now();
    }

    /// Approximate in-memory weight in bytes.
    pub fn weight(&self) -> u64 {
        (self.body.len() + self.content_type.len()) as u64
    }

    pub(crate) fn encode(&self) -> Result<Vec<u8>, CacheError> {
        bincode::serialize(self).map_err(|e| CacheError::Encode(e.to_string()))
    }

    pub(crate) fn decode(data: &[u8]) -> Result<Self, CacheError> {
        bincode::deserialize(data).map_err(|e| CacheError::Decode(e.to_string()))
    }
}
