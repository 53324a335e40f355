//! On-disk tile cache store with size-bounded eviction.
//!
//! Entries are serialized with bincode and stored as one file per URL. When a
//! write pushes the store past its capacity, the oldest files are evicted
//! until the store is back under its eviction target.
//!
//! # Eviction Strategy
//!
//! Uses LRU approximation based on file modification time (mtime):
//! - Reads refresh the mtime of the entry they hit
//! - When the store exceeds its limit, oldest files are deleted first
//! - Eviction targets 90% of limit (leaving 10% headroom for new writes)
//!
//! # File Layout
//!
//! ```text
//! {cache_dir}/{sha256(url)}.tile
//! ```
//!
//! The file stem is the same digest that [`fingerprint`] reports, so log
//! lines can be correlated with files on disk.

use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::entry::CacheEntry;
use super::traits::{BoxFuture, CacheError, CacheStore, GcResult};
use crate::fetch::fingerprint;

/// Target percentage of limit after eviction (0.9 = 90%).
const EVICTION_TARGET_PERCENTAGE: f64 = 0.9;

/// File extension of stored entries.
const ENTRY_EXTENSION: &str = "tile";

/// File extension of in-progress writes.
const TEMP_EXTENSION: &str = "tmp";

/// On-disk cache store.
///
/// Reads and writes run on the blocking thread pool. Each write goes through
/// a uniquely named temp file followed by an atomic rename, so concurrent
/// writers to the same key never interleave and readers only ever observe
/// complete entries.
pub struct DiskCacheStore {
    /// Cache directory path.
    directory: PathBuf,

    /// Maximum size in bytes.
    max_size_bytes: AtomicU64,

    /// Current stored size (approximate between GC cycles).
    cached_size: AtomicU64,

    /// Current entry count (approximate between GC cycles).
    cached_count: AtomicU64,

    /// Sequence used to name temp files.
    write_seq: AtomicU64,

    /// Held across the existence check and rename of a write so the
    /// counters see each first write of a key exactly once.
    rename_lock: Arc<Mutex<()>>,
}

impl DiskCacheStore {
    /// Open a store rooted at `directory`, creating it if needed.
    ///
    /// Existing entries are scanned to seed the size counters. Temp files
    /// stranded by an interrupted write are removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub async fn open(
        directory: impl Into<PathBuf>,
        max_size_bytes: u64,
    ) -> Result<Arc<Self>, CacheError> {
        let directory = directory.into();
        tokio::fs::create_dir_all(&directory).await?;

        let scan_dir = directory.clone();
        let (files, swept) = tokio::task::spawn_blocking(move || {
            let swept = Self::sweep_temp_files(&scan_dir);
            (Self::collect_cache_files(&scan_dir), swept)
        })
        .await
        .map_err(|e| CacheError::SpawnError(e.to_string()))?;
        if swept > 0 {
            debug!(dir = %directory.display(), count = swept, "Removed stranded temp files");
        }
        let initial_size: u64 = files.iter().map(|(_, _, size)| size).sum();

        info!(
            dir = %directory.display(),
            max_bytes = max_size_bytes,
            entries = files.len(),
            size = initial_size,
            "Disk cache store opened"
        );

        Ok(Arc::new(Self {
            directory,
            max_size_bytes: AtomicU64::new(max_size_bytes),
            cached_size: AtomicU64::new(initial_size),
            cached_count: AtomicU64::new(files.len() as u64),
            write_seq: AtomicU64::new(0),
            rename_lock: Arc::new(Mutex::new(())),
        }))
    }

    /// The directory entries are stored in.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path of the file backing `key`.
    pub fn entry_path(&self, key: &str) -> PathBuf {
        self.directory.join(Self::key_to_filename(key))
    }

    /// Remove every stored entry.
    pub async fn clear(&self) -> Result<GcResult, CacheError> {
        let directory = self.directory.clone();
        let result = tokio::task::spawn_blocking(move || {
            let start = Instant::now();
            let mut result = GcResult::default();
            for (path, _, size) in Self::collect_cache_files(&directory) {
                match std::fs::remove_file(&path) {
                    Ok(()) => {
                        result.entries_removed += 1;
                        result.bytes_freed += size;
                    }
                    Err(e) => debug!(path = %path.display(), error = %e, "Failed to delete cache file"),
                }
            }
            result.duration_ms = start.elapsed().as_millis() as u64;
            result
        })
        .await
        .map_err(|e| CacheError::SpawnError(e.to_string()))?;

        self.cached_size.store(0, Ordering::Relaxed);
        self.cached_count.store(0, Ordering::Relaxed);
        info!(
            entries_removed = result.entries_removed,
            bytes_freed = result.bytes_freed,
            "Disk cache cleared"
        );
        Ok(result)
    }

    /// Run a single GC cycle.
    async fn run_gc_cycle(&self) -> Result<GcResult, CacheError> {
        let max_bytes = self.max_size_bytes.load(Ordering::Relaxed);
        let directory = self.directory.clone();

        let result =
            tokio::task::spawn_blocking(move || Self::gc_cycle_blocking(&directory, max_bytes))
                .await
                .map_err(|e| CacheError::SpawnError(e.to_string()))?;

        self.cached_size.store(result.remaining_size, Ordering::Relaxed);
        self.cached_count
            .store(result.remaining_count as u64, Ordering::Relaxed);

        if result.entries_removed > 0 {
            info!(
                entries_removed = result.entries_removed,
                bytes_freed = result.bytes_freed,
                duration_ms = result.duration_ms,
                "Disk cache eviction complete"
            );
        }

        Ok(GcResult {
            entries_removed: result.entries_removed,
            bytes_freed: result.bytes_freed,
            duration_ms: result.duration_ms,
        })
    }

    /// Blocking GC implementation.
    fn gc_cycle_blocking(directory: &Path, max_bytes: u64) -> GcCycleResult {
        let start = Instant::now();

        let mut files = Self::collect_cache_files(directory);
        let total_size: u64 = files.iter().map(|(_, _, size)| size).sum();
        let file_count = files.len();

        debug!(
            file_count = file_count,
            total_size = total_size,
            limit = max_bytes,
            "GC cycle scan complete"
        );

        if total_size <= max_bytes {
            return GcCycleResult {
                entries_removed: 0,
                bytes_freed: 0,
                remaining_size: total_size,
                remaining_count: file_count,
                duration_ms: start.elapsed().as_millis() as u64,
            };
        }

        let target_size = (max_bytes as f64 * EVICTION_TARGET_PERCENTAGE) as u64;

        info!(
            current_size = total_size,
            limit = max_bytes,
            target = target_size,
            "Disk cache over limit, starting eviction"
        );

        // Oldest first
        files.sort_by_key(|(_, mtime, _)| *mtime);

        let mut bytes_freed = 0u64;
        let mut files_deleted = 0usize;
        let mut remaining_size = total_size;

        for (path, _mtime, size) in files {
            if remaining_size <= target_size {
                break;
            }

            match std::fs::remove_file(&path) {
                Ok(()) => {
                    bytes_freed += size;
                    remaining_size = remaining_size.saturating_sub(size);
                    files_deleted += 1;
                }
                Err(e) => {
                    debug!(
                        path = %path.display(),
                        error = %e,
                        "Failed to delete cache file during eviction"
                    );
                }
            }
        }

        GcCycleResult {
            entries_removed: files_deleted,
            bytes_freed,
            remaining_size,
            remaining_count: file_count - files_deleted,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Collect all entry files with their mtime and size.
    fn collect_cache_files(dir: &Path) -> Vec<(PathBuf, SystemTime, u64)> {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(
                    dir = %dir.display(),
                    error = %e,
                    "Failed to read directory during cache scan"
                );
                return Vec::new();
            }
        };

        entries
            .flatten()
            .filter(|entry| {
                entry
                    .path()
                    .extension()
                    .is_some_and(|ext| ext == ENTRY_EXTENSION)
            })
            .filter_map(|entry| {
                let metadata = entry.metadata().ok()?;
                if !metadata.is_file() {
                    return None;
                }
                let mtime = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
                Some((entry.path(), mtime, metadata.len()))
            })
            .collect()
    }

    /// Delete leftover temp files, returning how many were removed.
    fn sweep_temp_files(dir: &Path) -> usize {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return 0;
        };

        entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == TEMP_EXTENSION))
            .filter(|path| std::fs::remove_file(path).is_ok())
            .count()
    }

    /// Generate a safe filename from a cache key.
    fn key_to_filename(key: &str) -> String {
        format!("{}.{}", fingerprint(key), ENTRY_EXTENSION)
    }

    fn read_blocking(path: &Path) -> Result<Option<CacheEntry>, CacheError> {
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CacheError::Io(e)),
        };

        match CacheEntry::decode(&data) {
            Ok(entry) => {
                // Refresh mtime so eviction sees this entry as recently used
                if let Err(e) = File::options()
                    .write(true)
                    .open(path)
                    .and_then(|f| f.set_modified(SystemTime::now()))
                {
                    debug!(path = %path.display(), error = %e, "Failed to refresh cache mtime");
                }
                Ok(Some(entry))
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Discarding corrupt cache entry");
                let _ = std::fs::remove_file(path);
                Ok(None)
            }
        }
    }
}

/// Result of a GC cycle with internal details.
struct GcCycleResult {
    entries_removed: usize,
    bytes_freed: u64,
    remaining_size: u64,
    remaining_count: usize,
    duration_ms: u64,
}

impl CacheStore for DiskCacheStore {
    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<CacheEntry>, CacheError>> {
        let path = self.entry_path(key);
        Box::pin(async move {
            tokio::task::spawn_blocking(move || Self::read_blocking(&path))
                .await
                .map_err(|e| CacheError::SpawnError(e.to_string()))?
        })
    }

    fn put(&self, key: &str, entry: CacheEntry) -> BoxFuture<'_, Result<(), CacheError>> {
        let path = self.entry_path(key);
        let seq = self.write_seq.fetch_add(1, Ordering::Relaxed);
        Box::pin(async move {
            let data = entry.encode()?;
            let size = data.len() as u64;
            let max = self.max_size_bytes.load(Ordering::Relaxed);
            if size > max {
                return Err(CacheError::ValueTooLarge { size, max });
            }

            // Write and rename in one blocking task so a cancelled caller
            // cannot strand a temp file
            let temp_path = path.with_extension(format!("{}.{}", seq, TEMP_EXTENSION));
            let rename_lock = Arc::clone(&self.rename_lock);
            let replaced = tokio::task::spawn_blocking(move || -> Result<Option<u64>, CacheError> {
                std::fs::write(&temp_path, &data)?;
                let _guard = rename_lock.lock();
                let replaced = std::fs::metadata(&path).ok().map(|m| m.len());
                if let Err(e) = std::fs::rename(&temp_path, &path) {
                    let _ = std::fs::remove_file(&temp_path);
                    return Err(CacheError::Io(e));
                }
                Ok(replaced)
            })
            .await
            .map_err(|e| CacheError::SpawnError(e.to_string()))??;

            match replaced {
                Some(old_size) => {
                    self.cached_size.fetch_add(size, Ordering::Relaxed);
                    let _ = self.cached_size.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
                        Some(v.saturating_sub(old_size))
                    });
                }
                None => {
                    self.cached_size.fetch_add(size, Ordering::Relaxed);
                    self.cached_count.fetch_add(1, Ordering::Relaxed);
                }
            }

            if self.cached_size.load(Ordering::Relaxed) > max {
                self.run_gc_cycle().await?;
            }

            Ok(())
        })
    }

    fn evict(&self, key: &str) -> BoxFuture<'_, Result<bool, CacheError>> {
        let path = self.entry_path(key);
        Box::pin(async move {
            let size = tokio::fs::metadata(&path).await.map(|m| m.len()).unwrap_or(0);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    let _ = self.cached_size.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
                        Some(v.saturating_sub(size))
                    });
                    let _ = self.cached_count.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
                        Some(v.saturating_sub(1))
                    });
                    Ok(true)
                }
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
                Err(e) => Err(CacheError::Io(e)),
            }
        })
    }

    fn contains(&self, key: &str) -> BoxFuture<'_, Result<bool, CacheError>> {
        let path = self.entry_path(key);
        Box::pin(async move { Ok(tokio::fs::try_exists(&path).await?) })
    }

    fn size_bytes(&self) -> u64 {
        self.cached_size.load(Ordering::Relaxed)
    }

    fn entry_count(&self) -> u64 {
        self.cached_count.load(Ordering::Relaxed)
    }

    fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes.load(Ordering::Relaxed)
    }

    fn gc(&self) -> BoxFuture<'_, Result<GcResult, CacheError>> {
        Box::pin(async move { self.run_gc_cycle().await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    const URL_1: &str = "http://a.tile.openstreetmap.org/10/511/340.png";
    const URL_2: &str = "http://a.tile.openstreetmap.org/10/512/340.png";
    const URL_3: &str = "http://a.tile.openstreetmap.org/10/513/340.png";

    async fn create_test_store(max_size: u64) -> (TempDir, Arc<DiskCacheStore>) {
        let temp_dir = TempDir::new().unwrap();
        let store = DiskCacheStore::open(temp_dir.path(), max_size).await.unwrap();
        (temp_dir, store)
    }

    fn png_entry(len: usize) -> CacheEntry {
        CacheEntry::new(vec![0u8; len], "image/png")
    }

    fn age_file(store: &DiskCacheStore, key: &str, secs_ago: u64) {
        let mtime = SystemTime::now() - Duration::from_secs(secs_ago);
        filetime::set_file_mtime(
            store.entry_path(key),
            filetime::FileTime::from_system_time(mtime),
        )
        .unwrap();
    }

    #[tokio::test]
    async fn test_disk_store_put_and_get() {
        let (_temp_dir, store) = create_test_store(1_000_000).await;

        let entry = CacheEntry::new(vec![1, 2, 3], "image/png");
        store.put(URL_1, entry.clone()).await.unwrap();

        let value = store.get(URL_1).await.unwrap();
        assert_eq!(value, Some(entry));
        assert_eq!(store.entry_count(), 1);
        assert!(store.size_bytes() > 3);
    }

    #[tokio::test]
    async fn test_disk_store_get_missing() {
        let (_temp_dir, store) = create_test_store(1_000_000).await;
        assert!(store.get(URL_1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_disk_store_evict() {
        let (_temp_dir, store) = create_test_store(1_000_000).await;

        store.put(URL_1, png_entry(10)).await.unwrap();
        assert!(store.evict(URL_1).await.unwrap());
        assert!(store.get(URL_1).await.unwrap().is_none());
        assert!(!store.evict(URL_1).await.unwrap());
        assert_eq!(store.entry_count(), 0);
        assert_eq!(store.size_bytes(), 0);
    }

    #[tokio::test]
    async fn test_disk_store_contains() {
        let (_temp_dir, store) = create_test_store(1_000_000).await;

        assert!(!store.contains(URL_1).await.unwrap());
        store.put(URL_1, png_entry(1)).await.unwrap();
        assert!(store.contains(URL_1).await.unwrap());
    }

    #[tokio::test]
    async fn test_disk_store_replace_existing() {
        let (_temp_dir, store) = create_test_store(1_000_000).await;

        store.put(URL_1, png_entry(100)).await.unwrap();
        let replacement = CacheEntry::new(vec![4, 5, 6, 7], "image/jpeg");
        store.put(URL_1, replacement.clone()).await.unwrap();

        assert_eq!(store.get(URL_1).await.unwrap(), Some(replacement));
        assert_eq!(store.entry_count(), 1);
    }

    #[tokio::test]
    async fn test_disk_store_reopen_sees_existing_entries() {
        let temp_dir = TempDir::new().unwrap();
        {
            let store = DiskCacheStore::open(temp_dir.path(), 1_000_000).await.unwrap();
            store.put(URL_1, png_entry(100)).await.unwrap();
            store.put(URL_2, png_entry(100)).await.unwrap();
        }

        let store = DiskCacheStore::open(temp_dir.path(), 1_000_000).await.unwrap();
        assert_eq!(store.entry_count(), 2);
        assert!(store.size_bytes() >= 200);
        assert!(store.get(URL_2).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_disk_store_evicts_oldest_when_over_capacity() {
        let (_temp_dir, store) = create_test_store(2500).await;

        store.put(URL_1, png_entry(1000)).await.unwrap();
        age_file(&store, URL_1, 3600);
        store.put(URL_2, png_entry(1000)).await.unwrap();
        age_file(&store, URL_2, 1800);

        // Third write crosses the limit and triggers eviction
        store.put(URL_3, png_entry(1000)).await.unwrap();

        assert!(!store.contains(URL_1).await.unwrap());
        assert!(store.contains(URL_2).await.unwrap());
        assert!(store.contains(URL_3).await.unwrap());
        assert!(store.size_bytes() <= 2500);
    }

    #[tokio::test]
    async fn test_disk_store_read_refreshes_recency() {
        let (_temp_dir, store) = create_test_store(2500).await;

        store.put(URL_1, png_entry(1000)).await.unwrap();
        age_file(&store, URL_1, 3600);
        store.put(URL_2, png_entry(1000)).await.unwrap();
        age_file(&store, URL_2, 1800);

        // Reading URL_1 makes URL_2 the least recently used
        assert!(store.get(URL_1).await.unwrap().is_some());
        store.put(URL_3, png_entry(1000)).await.unwrap();

        assert!(store.contains(URL_1).await.unwrap());
        assert!(!store.contains(URL_2).await.unwrap());
    }

    #[tokio::test]
    async fn test_disk_store_rejects_oversized_entry() {
        let (_temp_dir, store) = create_test_store(100).await;

        let result = store.put(URL_1, png_entry(1000)).await;
        assert!(matches!(result, Err(CacheError::ValueTooLarge { .. })));
        assert!(!store.contains(URL_1).await.unwrap());
    }

    #[tokio::test]
    async fn test_disk_store_corrupt_entry_is_a_miss() {
        let (_temp_dir, store) = create_test_store(1_000_000).await;

        std::fs::write(store.entry_path(URL_1), b"not bincode").unwrap();

        assert!(store.get(URL_1).await.unwrap().is_none());
        assert!(!store.entry_path(URL_1).exists());
    }

    #[tokio::test]
    async fn test_disk_store_atomic_write_leaves_no_temp_files() {
        let (_temp_dir, store) = create_test_store(1_000_000).await;

        store.put(URL_1, png_entry(10)).await.unwrap();

        let temp_files: Vec<_> = std::fs::read_dir(store.directory())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == TEMP_EXTENSION))
            .collect();
        assert!(temp_files.is_empty(), "Temp files should not remain");
    }

    #[tokio::test]
    async fn test_disk_store_concurrent_writers_same_key() {
        let (_temp_dir, store) = create_test_store(1_000_000).await;

        let writes = (0..8u8).map(|i| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.put(URL_1, png_entry(10 + i as usize)).await })
        });
        for handle in futures::future::join_all(writes).await {
            handle.unwrap().unwrap();
        }

        let entry = store.get(URL_1).await.unwrap().unwrap();
        assert!((10..18).contains(&entry.body.len()));
    }

    #[tokio::test]
    async fn test_disk_store_concurrent_first_writes_count_once() {
        let (_temp_dir, store) = create_test_store(1_000_000).await;

        for _ in 0..4 {
            let writes = (0..8u8).map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.put(URL_2, png_entry(20 + i as usize)).await })
            });
            for handle in futures::future::join_all(writes).await {
                handle.unwrap().unwrap();
            }
        }

        assert_eq!(store.entry_count(), 1);
        let on_disk = std::fs::metadata(store.entry_path(URL_2)).unwrap().len();
        assert_eq!(store.size_bytes(), on_disk);
    }

    #[tokio::test]
    async fn test_disk_store_open_removes_stranded_temp_files() {
        let temp_dir = TempDir::new().unwrap();
        {
            let store = DiskCacheStore::open(temp_dir.path(), 1_000_000).await.unwrap();
            store.put(URL_1, png_entry(10)).await.unwrap();
        }
        let stranded = temp_dir.path().join(format!("deadbeef.3.{}", TEMP_EXTENSION));
        std::fs::write(&stranded, vec![0u8; 64]).unwrap();

        let store = DiskCacheStore::open(temp_dir.path(), 1_000_000).await.unwrap();

        assert!(!stranded.exists());
        assert_eq!(store.entry_count(), 1);
        assert!(store.get(URL_1).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_disk_store_clear() {
        let (_temp_dir, store) = create_test_store(1_000_000).await;

        store.put(URL_1, png_entry(10)).await.unwrap();
        store.put(URL_2, png_entry(10)).await.unwrap();

        let result = store.clear().await.unwrap();
        assert_eq!(result.entries_removed, 2);
        assert_eq!(store.entry_count(), 0);
        assert!(store.get(URL_1).await.unwrap().is_none());
    }

    #[test]
    fn test_key_to_filename() {
        let filename = DiskCacheStore::key_to_filename(URL_1);
        assert!(filename.ends_with(".tile"));
        assert!(!filename.contains('/'));
        assert!(!filename.contains(':'));
        assert_eq!(filename.len(), 64 + ".tile".len());
    }

    #[test]
    fn test_key_to_filename_deterministic() {
        let f1 = DiskCacheStore::key_to_filename(URL_1);
        let f2 = DiskCacheStore::key_to_filename(URL_1);
        assert_eq!(f1, f2);
        assert_ne!(f1, DiskCacheStore::key_to_filename(URL_2));
    }
}
