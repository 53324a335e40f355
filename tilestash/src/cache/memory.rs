//! In-memory cache store using moka.
//!
//! Wraps `moka::future::Cache` to provide an async-safe, lock-free store with
//! automatic LRU eviction. Entries are weighted by body size so the capacity
//! is expressed in bytes, like the disk store.
//!
//! The fetcher falls back to it when the cache directory cannot be opened;
//! tests use it as a lightweight store.
//!
//! # Garbage Collection
//!
//! Moka handles eviction automatically when the cache exceeds its size limit.
//! The `gc()` method runs pending maintenance tasks but typically doesn't need
//! to be called manually.

use std::sync::atomic::{AtomicU64, Ordering};

use moka::future::Cache as MokaCache;

use super::entry::CacheEntry;
use super::traits::{BoxFuture, CacheError, CacheStore, GcResult};

/// In-memory cache store using moka.
pub struct MemoryCacheStore {
    /// The underlying moka cache.
    cache: MokaCache<String, CacheEntry>,

    /// Maximum size in bytes.
    max_size_bytes: AtomicU64,
}

impl MemoryCacheStore {
    /// Create a new memory store holding at most `max_size_bytes` of entries.
    pub fn new(max_size_bytes: u64) -> Self {
        let cache = MokaCache::builder()
            // moka uses u32 for weights, cap at u32::MAX for very large entries
            .weigher(|_key: &String, entry: &CacheEntry| -> u32 {
                entry.weight().min(u32::MAX as u64) as u32
            })
            .max_capacity(max_size_bytes)
            .build();

        Self {
            cache,
            max_size_bytes: AtomicU64::new(max_size_bytes),
        }
    }
}

impl CacheStore for MemoryCacheStore {
    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<CacheEntry>, CacheError>> {
        let key = key.to_string();
        Box::pin(async move { Ok(self.cache.get(&key).await) })
    }

    fn put(&self, key: &str, entry: CacheEntry) -> BoxFuture<'_, Result<(), CacheError>> {
        let key = key.to_string();
        Box::pin(async move {
            let size = entry.weight();
            let max = self.max_size_bytes();
            if size > max {
                return Err(CacheError::ValueTooLarge { size, max });
            }
            self.cache.insert(key, entry).await;
            Ok(())
        })
    }

    fn evict(&self, key: &str) -> BoxFuture<'_, Result<bool, CacheError>> {
        let key = key.to_string();
        Box::pin(async move { Ok(self.cache.remove(&key).await.is_some()) })
    }

    fn contains(&self, key: &str) -> BoxFuture<'_, Result<bool, CacheError>> {
        let key = key.to_string();
        Box::pin(async move { Ok(self.cache.contains_key(&key)) })
    }

    fn size_bytes(&self) -> u64 {
        self.cache.weighted_size()
    }

    fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes.load(Ordering::Relaxed)
    }

    fn gc(&self) -> BoxFuture<'_, Result<GcResult, CacheError>> {
        Box::pin(async move {
            let start = std::time::Instant::now();
            let size_before = self.cache.weighted_size();
            let count_before = self.cache.entry_count();

            self.cache.run_pending_tasks().await;

            let size_after = self.cache.weighted_size();
            let count_after = self.cache.entry_count();

            Ok(GcResult {
                entries_removed: count_before.saturating_sub(count_after) as usize,
                bytes_freed: size_before.saturating_sub(size_after),
                duration_ms: start.elapsed().as_millis() as u64,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn png(len: usize) -> CacheEntry {
        CacheEntry::new(vec![0u8; len], "image/png")
    }

    #[tokio::test]
    async fn test_memory_store_new() {
        let store = MemoryCacheStore::new(1_000_000);
        assert_eq!(store.max_size_bytes(), 1_000_000);
        assert_eq!(store.entry_count(), 0);
        assert_eq!(store.size_bytes(), 0);
    }

    #[tokio::test]
    async fn test_memory_store_put_and_get() {
        let store = MemoryCacheStore::new(1_000_000);
        let entry = CacheEntry::new(vec![1, 2, 3], "image/png");

        store.put("a", entry.clone()).await.unwrap();

        assert_eq!(store.get("a").await.unwrap(), Some(entry));
        assert!(store.get("b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_store_evict() {
        let store = MemoryCacheStore::new(1_000_000);

        store.put("a", png(3)).await.unwrap();
        assert!(store.contains("a").await.unwrap());

        assert!(store.evict("a").await.unwrap());
        assert!(!store.contains("a").await.unwrap());
        assert!(!store.evict("a").await.unwrap());
    }

    #[tokio::test]
    async fn test_memory_store_rejects_oversized_entry() {
        let store = MemoryCacheStore::new(100);
        let result = store.put("a", png(1000)).await;
        assert!(matches!(result, Err(CacheError::ValueTooLarge { .. })));
    }

    #[tokio::test]
    async fn test_memory_store_lru_eviction() {
        let store = MemoryCacheStore::new(2500);

        store.put("key1", png(1000)).await.unwrap();
        store.put("key2", png(1000)).await.unwrap();
        store.put("key3", png(1000)).await.unwrap();

        store.gc().await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        store.gc().await.unwrap();

        assert!(
            store.size_bytes() <= 2500,
            "Expected size <= 2500, got {}",
            store.size_bytes()
        );
    }

    #[tokio::test]
    async fn test_memory_store_concurrent_access() {
        let store = Arc::new(MemoryCacheStore::new(10_000_000));
        let mut handles = Vec::new();

        for i in 0..50 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let key = format!("http://tiles/{}.png", i);
                let entry = CacheEntry::new(vec![i as u8; 100], "image/png");

                store.put(&key, entry.clone()).await.unwrap();
                assert_eq!(store.get(&key).await.unwrap(), Some(entry));
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        // moka is eventually consistent
        store.gc().await.unwrap();
        assert_eq!(store.entry_count(), 50);
    }
}
