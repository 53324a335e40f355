//! Core traits for the tile cache store.
//!
//! The `CacheStore` trait is the persistent cache capability consumed by the
//! [`CachingFetcher`](crate::fetch::CachingFetcher). Stores are keyed by the
//! request URL and hold complete [`CacheEntry`] values (body, content type,
//! validators and timestamp) so the fetcher can evaluate staleness.
//!
//! # Design Principles
//!
//! - **URL keys**: The store derives its own on-disk naming from the key
//! - **Self-contained eviction**: Stores enforce their capacity ceiling
//! - **Dyn-compatible**: Uses `Pin<Box<dyn Future>>` for trait object support
//!
//! # Example
//!
//! ```ignore
//! use tilestash::cache::{CacheEntry, CacheStore, DiskCacheStore};
//!
//! let store = DiskCacheStore::open("/tmp/tiles", 250 * 1024 * 1024).await?;
//! store.put("http://a.tile.openstreetmap.org/1/1/1.png", entry).await?;
//! let entry = store.get("http://a.tile.openstreetmap.org/1/1/1.png").await?;
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use super::entry::CacheEntry;

/// Result of a garbage collection operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GcResult {
    /// Number of entries removed during GC.
    pub entries_removed: usize,
    /// Total bytes freed during GC.
    pub bytes_freed: u64,
    /// Duration of the GC operation in milliseconds.
    pub duration_ms: u64,
}

impl fmt::Display for GcResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GC: removed {} entries, freed {} bytes in {}ms",
            self.entries_removed, self.bytes_freed, self.duration_ms
        )
    }
}

/// Errors that can occur during cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// I/O error during cache operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to serialize an entry.
    #[error("Failed to encode cache entry: {0}")]
    Encode(String),

    /// A stored entry could not be deserialized.
    #[error("Failed to decode cache entry: {0}")]
    Decode(String),

    /// Entry exceeds the configured capacity on its own.
    #[error("Entry too large: {size} bytes (max: {max})")]
    ValueTooLarge { size: u64, max: u64 },

    /// Failed to run a blocking task.
    #[error("Failed to spawn task: {0}")]
    SpawnError(String),
}

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Persistent key-value store for tile responses.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` and tolerate concurrent reads and
/// writes. Writers to the same key may be serialized; different keys must
/// not block each other.
pub trait CacheStore: Send + Sync {
    /// Retrieve the entry stored for `key`.
    ///
    /// Returns `Ok(None)` on a miss. A successful read counts as a use for
    /// least-recently-used eviction.
    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<CacheEntry>, CacheError>>;

    /// Store `entry` under `key`, replacing any previous value.
    ///
    /// Eviction may run if the store exceeds its capacity afterwards.
    fn put(&self, key: &str, entry: CacheEntry) -> BoxFuture<'_, Result<(), CacheError>>;

    /// Remove the entry for `key`.
    ///
    /// Returns `Ok(true)` if an entry existed.
    fn evict(&self, key: &str) -> BoxFuture<'_, Result<bool, CacheError>>;

    /// Check if a key exists without reading it.
    fn contains(&self, key: &str) -> BoxFuture<'_, Result<bool, CacheError>>;

    /// Current size of all stored entries in bytes.
    fn size_bytes(&self) -> u64;

    /// Current number of stored entries.
    fn entry_count(&self) -> u64;

    /// Configured capacity ceiling in bytes.
    fn max_size_bytes(&self) -> u64;

    /// Trigger eviction down to the capacity ceiling.
    fn gc(&self) -> BoxFuture<'_, Result<GcResult, CacheError>>;
}
