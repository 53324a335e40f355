//! Offline-aware caching tile fetcher.
//!
//! Every fetch re-reads reachability and then follows one of two paths:
//!
//! - **Online** (network-first with staleness tolerance): a cached entry no
//!   older than `max_age` is served directly; otherwise the network is asked,
//!   conditionally when the entry carries validators. If the round-trip
//!   fails, an entry no older than `max_stale` is served instead.
//! - **Offline** (cache-only): any cached entry is served regardless of age
//!   and the network is never contacted.
//!
//! Successful responses are written to the cache store at most once. Cache
//! failures are logged and never fail the fetch.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::{FetchError, FetchResult};
use super::fingerprint::fingerprint;
use super::policy::{CachePolicy, Freshness};
use super::reachability::Reachability;
use super::transport::{HttpTransport, ReqwestTransport, TransportError, TransportRequest};
use crate::cache::{CacheEntry, CacheStore, DiskCacheStore, MemoryCacheStore};
use crate::config::{FetchConfig, FetchPolicy};

/// Where the bytes of a fetched tile came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileOrigin {
    /// Downloaded in this fetch.
    Network,
    /// Cached entry within `max_age`; no request was made.
    CacheFresh,
    /// Cached entry within `max_stale`, served because the network failed.
    CacheStale,
    /// Cached entry confirmed unchanged by a `304 Not Modified`.
    Revalidated,
    /// Cached entry served while the network was unreachable.
    Offline,
}

impl TileOrigin {
    /// True if the bytes came from the cache store.
    pub fn is_cached(&self) -> bool {
        !matches!(self, TileOrigin::Network)
    }
}

impl fmt::Display for TileOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TileOrigin::Network => "network",
            TileOrigin::CacheFresh => "cache (fresh)",
            TileOrigin::CacheStale => "cache (stale)",
            TileOrigin::Revalidated => "cache (revalidated)",
            TileOrigin::Offline => "cache (offline)",
        };
        f.write_str(name)
    }
}

/// A successfully fetched tile.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedTile {
    pub bytes: Bytes,
    pub content_type: String,
    pub origin: TileOrigin,
}

impl FetchedTile {
    fn from_entry(entry: CacheEntry, origin: TileOrigin) -> Self {
        Self {
            bytes: Bytes::from(entry.body),
            content_type: entry.content_type,
            origin,
        }
    }
}

/// Fetches tiles through the network and a persistent cache.
///
/// The fetcher is `Send + Sync` and meant to be shared behind an `Arc`.
/// It keeps no per-fetch state of its own, so concurrent fetches of
/// different URLs only meet in the cache store.
pub struct CachingFetcher {
    transport: Arc<dyn HttpTransport>,
    reachability: Arc<dyn Reachability>,
    store: Option<Arc<dyn CacheStore>>,
    policy: FetchPolicy,
}

impl CachingFetcher {
    /// Assembles a fetcher from its capabilities.
    ///
    /// Without a store every online fetch goes to the network and every
    /// offline fetch fails with [`FetchError::NotCached`].
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        reachability: Arc<dyn Reachability>,
        store: Option<Arc<dyn CacheStore>>,
        policy: FetchPolicy,
    ) -> Self {
        Self {
            transport,
            reachability,
            store,
            policy,
        }
    }

    /// Builds a fetcher with the reqwest transport and a disk store.
    ///
    /// If the cache directory cannot be opened the fetcher caches in memory
    /// for the lifetime of the process instead of failing.
    ///
    /// # Errors
    ///
    /// Returns an error only if the HTTP client cannot be constructed.
    pub async fn open(
        config: &FetchConfig,
        reachability: Arc<dyn Reachability>,
    ) -> Result<Self, TransportError> {
        let transport = ReqwestTransport::new(config.request_timeout, &config.user_agent)?;
        let store = open_store(&config.cache_directory, config.policy.cache_capacity_bytes).await;

        Ok(Self::new(
            Arc::new(transport),
            reachability,
            Some(store),
            config.policy.clone(),
        ))
    }

    pub fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    /// The cache store, if one is attached.
    pub fn store(&self) -> Option<&Arc<dyn CacheStore>> {
        self.store.as_ref()
    }

    /// Fetches the tile at `url`.
    pub async fn fetch(&self, url: &str) -> FetchResult<FetchedTile> {
        let reachable = self.reachability.is_reachable();
        let policy = CachePolicy::for_reachability(reachable, &self.policy);
        let cached = self.read_cache(url).await;

        match policy {
            CachePolicy::CacheOnly => self.serve_offline(url, cached),
            CachePolicy::NetworkPreferred { .. } => self.fetch_online(url, policy, cached).await,
        }
    }

    /// Fetches the tile at `url`, collapsing every failure to `None`.
    pub async fn fetch_bytes(&self, url: &str) -> Option<Bytes> {
        self.fetch(url).await.ok().map(|tile| tile.bytes)
    }

    /// Fetches the tile at `url` unless `cancel` fires first.
    ///
    /// Cancellation drops the in-flight request together with its body.
    pub async fn fetch_cancellable(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> FetchResult<FetchedTile> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(url = url, "Fetch cancelled");
                Err(FetchError::Cancelled { url: url.to_string() })
            }
            result = self.fetch(url) => result,
        }
    }

    fn serve_offline(&self, url: &str, cached: Option<CacheEntry>) -> FetchResult<FetchedTile> {
        match cached {
            Some(entry) => {
                debug!(url = url, age_secs = entry.age().as_secs(), "Offline, serving cached tile");
                Ok(FetchedTile::from_entry(entry, TileOrigin::Offline))
            }
            None => {
                debug!(url = url, "Offline and tile not cached");
                Err(FetchError::NotCached {
                    url: url.to_string(),
                })
            }
        }
    }

    async fn fetch_online(
        &self,
        url: &str,
        policy: CachePolicy,
        cached: Option<CacheEntry>,
    ) -> FetchResult<FetchedTile> {
        if let Some(entry) = &cached {
            if self.policy.freshness(entry.age()) == Freshness::Fresh {
                debug!(url = url, age_secs = entry.age().as_secs(), "Serving fresh cached tile");
                return Ok(FetchedTile::from_entry(entry.clone(), TileOrigin::CacheFresh));
            }
        }

        let request = TransportRequest::new(url, policy.header_value()).conditional(cached.as_ref());
        let response = match self.transport.get(request).await {
            Ok(response) => response,
            Err(source) => {
                let error = FetchError::Network {
                    url: url.to_string(),
                    source,
                };
                return self.stale_fallback(cached, error);
            }
        };

        if response.is_not_modified() {
            if let Some(mut entry) = cached {
                // A 304 may carry updated validators
                if response.etag.is_some() {
                    entry.etag = response.etag;
                }
                if response.last_modified.is_some() {
                    entry.last_modified = response.last_modified;
                }
                entry.touch();
                debug!(url = url, "Cached tile revalidated");
                self.write_cache(url, entry.clone()).await;
                return Ok(FetchedTile::from_entry(entry, TileOrigin::Revalidated));
            }
            // 304 without a conditional request
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: response.status,
            });
        }

        if !response.is_success() {
            let error = FetchError::HttpStatus {
                url: url.to_string(),
                status: response.status,
            };
            return self.stale_fallback(cached, error);
        }

        let no_store = response.is_no_store();
        let (body, content_type) = match (response.body, response.content_type) {
            (Some(body), Some(content_type)) => (body, content_type),
            (body, _) => {
                let missing = if body.is_none() { "body" } else { "content type" };
                return Err(self.no_content(url, missing));
            }
        };

        let bytes = match body.bytes().await {
            Ok(bytes) => bytes,
            Err(source) => {
                let error = FetchError::Network {
                    url: url.to_string(),
                    source,
                };
                return self.stale_fallback(cached, error);
            }
        };
        if bytes.is_empty() {
            return Err(self.no_content(url, "body"));
        }

        debug!(url = url, bytes = bytes.len(), content_type = %content_type, "Tile downloaded");

        if no_store {
            debug!(url = url, "Response marked no-store, not caching");
        } else {
            let entry = CacheEntry::new(bytes.to_vec(), content_type.clone())
                .with_validators(response.etag, response.last_modified);
            self.write_cache(url, entry).await;
        }

        Ok(FetchedTile {
            bytes,
            content_type,
            origin: TileOrigin::Network,
        })
    }

    fn stale_fallback(
        &self,
        cached: Option<CacheEntry>,
        error: FetchError,
    ) -> FetchResult<FetchedTile> {
        match cached {
            Some(entry) if self.policy.freshness(entry.age()) != Freshness::Expired => {
                info!(
                    url = error.url(),
                    error = %error,
                    age_secs = entry.age().as_secs(),
                    "Network failed, serving stale cached tile"
                );
                Ok(FetchedTile::from_entry(entry, TileOrigin::CacheStale))
            }
            _ => {
                warn!(url = error.url(), error = %error, "Tile fetch failed");
                Err(error)
            }
        }
    }

    fn no_content(&self, url: &str, missing: &'static str) -> FetchError {
        warn!(
            url = url,
            fingerprint = %fingerprint(url),
            missing = missing,
            "Tile response has no usable content"
        );
        FetchError::NoContent {
            url: url.to_string(),
            missing,
        }
    }

    async fn read_cache(&self, url: &str) -> Option<CacheEntry> {
        let store = self.store.as_ref()?;
        match store.get(url).await {
            Ok(entry) => entry,
            Err(e) => {
                warn!(url = url, error = %e, "Cache read failed, ignoring cache");
                None
            }
        }
    }

    async fn write_cache(&self, url: &str, entry: CacheEntry) {
        let Some(store) = self.store.as_ref() else {
            return;
        };
        if let Err(e) = store.put(url, entry).await {
            warn!(url = url, error = %e, "Cache write failed");
        }
    }
}

/// Opens the disk store at `directory`, or a memory store of the same
/// capacity if the directory is unusable.
async fn open_store(directory: &Path, capacity_bytes: u64) -> Arc<dyn CacheStore> {
    match DiskCacheStore::open(directory, capacity_bytes).await {
        Ok(store) => store,
        Err(e) => {
            warn!(
                dir = %directory.display(),
                error = %e,
                "Tile cache directory unavailable, caching in memory only"
            );
            Arc::new(MemoryCacheStore::new(capacity_bytes))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{BoxFuture, CacheError, GcResult};
    use crate::fetch::reachability::ManualReachability;
    use crate::fetch::transport::tests::{MockResponse, MockTransport};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, SystemTime};

    const URL: &str = "http://a.tile.openstreetmap.org/12/2047/1361.png";
    const DAY: Duration = Duration::from_secs(86_400);

    /// Memory store that counts writes.
    struct CountingStore {
        inner: MemoryCacheStore,
        puts: AtomicUsize,
    }

    impl CountingStore {
        fn new() -> Self {
            Self {
                inner: MemoryCacheStore::new(10_000_000),
                puts: AtomicUsize::new(0),
            }
        }

        fn puts(&self) -> usize {
            self.puts.load(Ordering::SeqCst)
        }
    }

    impl CacheStore for CountingStore {
        fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<CacheEntry>, CacheError>> {
            self.inner.get(key)
        }

        fn put(&self, key: &str, entry: CacheEntry) -> BoxFuture<'_, Result<(), CacheError>> {
            self.puts.fetch_add(1, Ordering::SeqCst);
            self.inner.put(key, entry)
        }

        fn evict(&self, key: &str) -> BoxFuture<'_, Result<bool, CacheError>> {
            self.inner.evict(key)
        }

        fn contains(&self, key: &str) -> BoxFuture<'_, Result<bool, CacheError>> {
            self.inner.contains(key)
        }

        fn size_bytes(&self) -> u64 {
            self.inner.size_bytes()
        }

        fn entry_count(&self) -> u64 {
            self.inner.entry_count()
        }

        fn max_size_bytes(&self) -> u64 {
            self.inner.max_size_bytes()
        }

        fn gc(&self) -> BoxFuture<'_, Result<GcResult, CacheError>> {
            self.inner.gc()
        }
    }

    /// Store whose every operation fails.
    struct BrokenStore;

    impl CacheStore for BrokenStore {
        fn get(&self, _key: &str) -> BoxFuture<'_, Result<Option<CacheEntry>, CacheError>> {
            Box::pin(async { Err(CacheError::Decode("broken".into())) })
        }

        fn put(&self, _key: &str, _entry: CacheEntry) -> BoxFuture<'_, Result<(), CacheError>> {
            Box::pin(async { Err(CacheError::Encode("broken".into())) })
        }

        fn evict(&self, _key: &str) -> BoxFuture<'_, Result<bool, CacheError>> {
            Box::pin(async { Ok(false) })
        }

        fn contains(&self, _key: &str) -> BoxFuture<'_, Result<bool, CacheError>> {
            Box::pin(async { Ok(false) })
        }

        fn size_bytes(&self) -> u64 {
            0
        }

        fn entry_count(&self) -> u64 {
            0
        }

        fn max_size_bytes(&self) -> u64 {
            0
        }

        fn gc(&self) -> BoxFuture<'_, Result<GcResult, CacheError>> {
            Box::pin(async { Ok(GcResult::default()) })
        }
    }

    struct Harness {
        transport: Arc<MockTransport>,
        reachability: Arc<ManualReachability>,
        store: Arc<CountingStore>,
        fetcher: CachingFetcher,
    }

    fn harness(transport: MockTransport, online: bool) -> Harness {
        let transport = Arc::new(transport);
        let reachability = Arc::new(ManualReachability::new(online));
        let store = Arc::new(CountingStore::new());
        let fetcher = CachingFetcher::new(
            Arc::clone(&transport) as Arc<dyn HttpTransport>,
            Arc::clone(&reachability) as Arc<dyn Reachability>,
            Some(Arc::clone(&store) as Arc<dyn CacheStore>),
            FetchPolicy::default(),
        );
        Harness {
            transport,
            reachability,
            store,
            fetcher,
        }
    }

    async fn seed(store: &CountingStore, body: &[u8], age: Duration) {
        let entry = CacheEntry::new(body.to_vec(), "image/png")
            .with_validators(Some("\"v1\"".into()), None)
            .stored_at(SystemTime::now() - age);
        store.inner.put(URL, entry).await.unwrap();
    }

    #[tokio::test]
    async fn test_online_miss_downloads_and_stores() {
        let h = harness(
            MockTransport::new().reply(MockResponse::ok(b"tile", "image/png").etag("\"e1\"")),
            true,
        );

        let tile = h.fetcher.fetch(URL).await.unwrap();

        assert_eq!(&tile.bytes[..], b"tile");
        assert_eq!(tile.content_type, "image/png");
        assert_eq!(tile.origin, TileOrigin::Network);
        assert_eq!(h.store.puts(), 1);

        let stored = h.store.get(URL).await.unwrap().unwrap();
        assert_eq!(stored.body, b"tile");
        assert_eq!(stored.etag.as_deref(), Some("\"e1\""));

        let requests = h.transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, URL);
        assert_eq!(requests[0].cache_control, "max-age=259200, max-stale=7776000");
        assert!(requests[0].if_none_match.is_none());
        assert_eq!(h.transport.tracker.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_online_fresh_entry_skips_network() {
        let h = harness(MockTransport::new(), true);
        seed(&h.store, b"cached", Duration::from_secs(60)).await;

        let tile = h.fetcher.fetch(URL).await.unwrap();

        assert_eq!(&tile.bytes[..], b"cached");
        assert_eq!(tile.origin, TileOrigin::CacheFresh);
        assert_eq!(h.transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_online_stale_entry_refreshed_from_network() {
        let h = harness(
            MockTransport::new().reply(MockResponse::ok(b"new", "image/png")),
            true,
        );
        seed(&h.store, b"old", 5 * DAY).await;

        let tile = h.fetcher.fetch(URL).await.unwrap();

        assert_eq!(&tile.bytes[..], b"new");
        assert_eq!(tile.origin, TileOrigin::Network);
        assert_eq!(h.transport.requests()[0].if_none_match.as_deref(), Some("\"v1\""));
        assert_eq!(h.store.get(URL).await.unwrap().unwrap().body, b"new");
    }

    #[tokio::test]
    async fn test_network_failure_serves_stale_entry() {
        let h = harness(
            MockTransport::new().fail(TransportError::Request("connection refused".into())),
            true,
        );
        seed(&h.store, b"stale", 30 * DAY).await;

        let tile = h.fetcher.fetch(URL).await.unwrap();

        assert_eq!(&tile.bytes[..], b"stale");
        assert_eq!(tile.origin, TileOrigin::CacheStale);
        assert_eq!(h.store.puts(), 0);
    }

    #[tokio::test]
    async fn test_network_failure_with_expired_entry_fails() {
        let h = harness(
            MockTransport::new().fail(TransportError::Timeout("30s".into())),
            true,
        );
        seed(&h.store, b"ancient", 120 * DAY).await;

        let result = h.fetcher.fetch(URL).await;

        assert!(matches!(
            result,
            Err(FetchError::Network {
                source: TransportError::Timeout(_),
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_network_failure_without_entry_fails() {
        let h = harness(
            MockTransport::new().fail(TransportError::Request("dns".into())),
            true,
        );

        assert!(matches!(
            h.fetcher.fetch(URL).await,
            Err(FetchError::Network { .. })
        ));
    }

    #[tokio::test]
    async fn test_error_status_falls_back_to_stale() {
        let h = harness(MockTransport::new().reply(MockResponse::status(503)), true);
        seed(&h.store, b"stale", 10 * DAY).await;

        let tile = h.fetcher.fetch(URL).await.unwrap();
        assert_eq!(tile.origin, TileOrigin::CacheStale);
    }

    #[tokio::test]
    async fn test_error_status_without_entry() {
        let h = harness(
            MockTransport::new().reply(MockResponse::status(404).with_body(b"not found")),
            true,
        );

        let result = h.fetcher.fetch(URL).await;

        assert!(matches!(
            result,
            Err(FetchError::HttpStatus { status: 404, .. })
        ));
        assert_eq!(h.store.puts(), 0);
        assert_eq!(h.transport.tracker.created(), 1);
        assert_eq!(h.transport.tracker.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_not_modified_revalidates_entry() {
        let h = harness(MockTransport::new().reply(MockResponse::not_modified()), true);
        seed(&h.store, b"cached", 4 * DAY).await;

        let tile = h.fetcher.fetch(URL).await.unwrap();

        assert_eq!(&tile.bytes[..], b"cached");
        assert_eq!(tile.origin, TileOrigin::Revalidated);
        assert_eq!(h.store.puts(), 1);

        let stored = h.store.get(URL).await.unwrap().unwrap();
        assert!(stored.age() < Duration::from_secs(60));
        assert_eq!(stored.etag.as_deref(), Some("\"v1\""));
    }

    #[tokio::test]
    async fn test_not_modified_updates_validators() {
        let h = harness(
            MockTransport::new().reply(
                MockResponse::not_modified()
                    .etag("\"v2\"")
                    .last_modified("Tue, 15 Oct 2024 08:00:00 GMT"),
            ),
            true,
        );
        seed(&h.store, b"cached", 4 * DAY).await;

        let tile = h.fetcher.fetch(URL).await.unwrap();
        assert_eq!(tile.origin, TileOrigin::Revalidated);

        let stored = h.store.get(URL).await.unwrap().unwrap();
        assert_eq!(&stored.body[..], b"cached");
        assert_eq!(stored.etag.as_deref(), Some("\"v2\""));
        assert_eq!(
            stored.last_modified.as_deref(),
            Some("Tue, 15 Oct 2024 08:00:00 GMT")
        );
    }

    #[tokio::test]
    async fn test_missing_content_type_is_no_content() {
        let h = harness(
            MockTransport::new().reply(MockResponse::ok(b"tile", "image/png").without_content_type()),
            true,
        );

        let result = h.fetcher.fetch(URL).await;

        assert!(matches!(
            result,
            Err(FetchError::NoContent {
                missing: "content type",
                ..
            })
        ));
        assert_eq!(h.store.puts(), 0);
        assert_eq!(h.transport.tracker.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_missing_body_is_no_content() {
        let h = harness(
            MockTransport::new().reply(MockResponse::ok(b"", "image/png").without_body()),
            true,
        );

        assert!(matches!(
            h.fetcher.fetch(URL).await,
            Err(FetchError::NoContent { missing: "body", .. })
        ));
        assert_eq!(h.store.puts(), 0);
    }

    #[tokio::test]
    async fn test_empty_body_is_no_content() {
        let h = harness(
            MockTransport::new().reply(MockResponse::ok(b"", "image/png")),
            true,
        );

        assert!(matches!(
            h.fetcher.fetch(URL).await,
            Err(FetchError::NoContent { .. })
        ));
        assert_eq!(h.transport.tracker.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_no_content_does_not_fall_back() {
        let h = harness(
            MockTransport::new().reply(MockResponse::ok(b"tile", "image/png").without_content_type()),
            true,
        );
        seed(&h.store, b"stale", 10 * DAY).await;

        assert!(matches!(
            h.fetcher.fetch(URL).await,
            Err(FetchError::NoContent { .. })
        ));
    }

    #[tokio::test]
    async fn test_body_read_failure_falls_back_to_stale() {
        let h = harness(
            MockTransport::new().reply(MockResponse::ok(b"tile", "image/png").body_error()),
            true,
        );
        seed(&h.store, b"stale", 10 * DAY).await;

        let tile = h.fetcher.fetch(URL).await.unwrap();

        assert_eq!(tile.origin, TileOrigin::CacheStale);
        assert_eq!(h.transport.tracker.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_no_store_response_not_persisted() {
        let h = harness(
            MockTransport::new()
                .reply(MockResponse::ok(b"tile", "image/png").cache_control("no-store")),
            true,
        );

        let tile = h.fetcher.fetch(URL).await.unwrap();

        assert_eq!(tile.origin, TileOrigin::Network);
        assert_eq!(h.store.puts(), 0);
        assert!(!h.store.contains(URL).await.unwrap());
    }

    #[tokio::test]
    async fn test_offline_serves_any_cached_entry() {
        let h = harness(MockTransport::new(), false);
        seed(&h.store, b"ancient", 365 * DAY).await;

        let tile = h.fetcher.fetch(URL).await.unwrap();

        assert_eq!(&tile.bytes[..], b"ancient");
        assert_eq!(tile.origin, TileOrigin::Offline);
        assert_eq!(h.transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_offline_miss_is_not_cached() {
        let h = harness(MockTransport::new(), false);

        assert!(matches!(
            h.fetcher.fetch(URL).await,
            Err(FetchError::NotCached { .. })
        ));
        assert_eq!(h.transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_reachability_reread_every_fetch() {
        let h = harness(
            MockTransport::new().reply(MockResponse::ok(b"tile", "image/png")),
            false,
        );

        assert!(h.fetcher.fetch(URL).await.is_err());

        h.reachability.set(true);
        let tile = h.fetcher.fetch(URL).await.unwrap();
        assert_eq!(tile.origin, TileOrigin::Network);

        h.reachability.set(false);
        let tile = h.fetcher.fetch(URL).await.unwrap();
        assert_eq!(tile.origin, TileOrigin::Offline);
        assert_eq!(h.transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_fetch_bytes_collapses_failures() {
        let h = harness(
            MockTransport::new().reply(MockResponse::ok(b"tile", "image/png")),
            true,
        );

        assert_eq!(h.fetcher.fetch_bytes(URL).await, Some(Bytes::from_static(b"tile")));

        h.reachability.set(false);
        assert_eq!(
            h.fetcher.fetch_bytes("http://a.tile.openstreetmap.org/1/0/0.png").await,
            None
        );
    }

    #[tokio::test]
    async fn test_cancellation_releases_body() {
        let h = harness(
            MockTransport::new().reply(
                MockResponse::ok(b"tile", "image/png").body_delay(Duration::from_secs(30)),
            ),
            true,
        );
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let result = h.fetcher.fetch_cancellable(URL, &cancel).await;

        assert!(matches!(result, Err(FetchError::Cancelled { .. })));
        assert_eq!(h.transport.tracker.created(), 1);
        assert_eq!(h.transport.tracker.outstanding(), 0);
        assert_eq!(h.store.puts(), 0);
    }

    #[tokio::test]
    async fn test_already_cancelled_token_short_circuits() {
        let h = harness(
            MockTransport::new().reply(MockResponse::ok(b"tile", "image/png")),
            true,
        );
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = h.fetcher.fetch_cancellable(URL, &cancel).await;

        assert!(matches!(result, Err(FetchError::Cancelled { .. })));
        assert_eq!(h.transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_without_store() {
        let transport = Arc::new(
            MockTransport::new().reply(MockResponse::ok(b"tile", "image/png")),
        );
        let reachability = Arc::new(ManualReachability::online());
        let fetcher = CachingFetcher::new(
            Arc::clone(&transport) as Arc<dyn HttpTransport>,
            Arc::clone(&reachability) as Arc<dyn Reachability>,
            None,
            FetchPolicy::default(),
        );

        assert_eq!(fetcher.fetch(URL).await.unwrap().origin, TileOrigin::Network);

        reachability.set(false);
        assert!(matches!(
            fetcher.fetch(URL).await,
            Err(FetchError::NotCached { .. })
        ));
        assert!(fetcher.store().is_none());
    }

    #[tokio::test]
    async fn test_broken_store_does_not_fail_fetch() {
        let transport = Arc::new(
            MockTransport::new().reply(MockResponse::ok(b"tile", "image/png")),
        );
        let fetcher = CachingFetcher::new(
            transport,
            Arc::new(ManualReachability::online()),
            Some(Arc::new(BrokenStore)),
            FetchPolicy::default(),
        );

        let tile = fetcher.fetch(URL).await.unwrap();
        assert_eq!(tile.origin, TileOrigin::Network);
    }

    #[tokio::test]
    async fn test_open_with_unusable_directory_caches_in_memory() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        let config = FetchConfig {
            // A regular file cannot be used as a cache directory
            cache_directory: temp.path().join("tiles"),
            ..FetchConfig::default()
        };

        let fetcher = CachingFetcher::open(&config, Arc::new(ManualReachability::offline()))
            .await
            .unwrap();
        let store = fetcher.store().unwrap();
        assert_eq!(store.max_size_bytes(), config.policy.cache_capacity_bytes);

        store
            .put(URL, CacheEntry::new(vec![1, 2, 3], "image/png"))
            .await
            .unwrap();
        let tile = fetcher.fetch(URL).await.unwrap();
        assert_eq!(tile.origin, TileOrigin::Offline);
        assert!(temp.path().is_file());
    }

    #[tokio::test]
    async fn test_open_with_directory_attaches_disk_store() {
        let temp = tempfile::TempDir::new().unwrap();
        let config = FetchConfig {
            cache_directory: temp.path().join("tiles"),
            ..FetchConfig::default()
        };

        let fetcher = CachingFetcher::open(&config, Arc::new(ManualReachability::offline()))
            .await
            .unwrap();
        let store = fetcher.store().unwrap();
        assert_eq!(store.max_size_bytes(), config.policy.cache_capacity_bytes);
    }

    #[test]
    fn test_origin_display() {
        assert_eq!(TileOrigin::Network.to_string(), "network");
        assert_eq!(TileOrigin::Offline.to_string(), "cache (offline)");
        assert!(TileOrigin::Revalidated.is_cached());
        assert!(!TileOrigin::Network.is_cached());
    }
}
