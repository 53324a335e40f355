//! Persistent tile response cache.
//!
//! The [`CacheStore`] trait is the capability the fetcher depends on. Two
//! implementations are provided:
//!
//! - [`DiskCacheStore`]: files on disk, mtime-based LRU eviction
//! - [`MemoryCacheStore`]: moka-backed, the fallback when the cache directory
//!   cannot be opened

mod disk;
mod entry;
mod memory;
mod traits;

pub use disk::DiskCacheStore;
pub use entry::CacheEntry;
pub use memory::MemoryCacheStore;
pub use traits::{BoxFuture, CacheError, CacheStore, GcResult};
