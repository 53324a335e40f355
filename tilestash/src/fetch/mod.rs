//! Tile fetching over HTTP with an offline-aware persistent cache.
//!
//! [`CachingFetcher`] combines three capabilities:
//!
//! - [`HttpTransport`]: performs requests ([`ReqwestTransport`] in production)
//! - [`Reachability`]: answers whether the network is usable right now
//! - [`CacheStore`](crate::cache::CacheStore): persists responses
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tilestash::config::FetchConfig;
//! use tilestash::fetch::{CachingFetcher, ManualReachability};
//!
//! let fetcher = CachingFetcher::open(&FetchConfig::default(), Arc::new(ManualReachability::online())).await?;
//! let tile = fetcher.fetch("http://a.tile.openstreetmap.org/1/1/1.png").await?;
//! println!("{} bytes from {}", tile.bytes.len(), tile.origin);
//! ```

mod error;
mod fetcher;
mod fingerprint;
mod policy;
mod reachability;
mod transport;

pub use error::{FetchError, FetchResult};
pub use fetcher::{CachingFetcher, FetchedTile, TileOrigin};
pub use fingerprint::{fingerprint, FINGERPRINT_LEN};
pub use policy::{CachePolicy, Freshness, UNBOUNDED_MAX_STALE_SECS};
pub use reachability::{
    probe_target, ConnectivityMonitor, ManualReachability, Reachability,
    DEFAULT_PROBE_INTERVAL, DEFAULT_PROBE_TIMEOUT,
};
pub use transport::{
    HttpTransport, ReqwestTransport, ResponseBody, TransportError, TransportRequest,
    TransportResponse,
};

#[cfg(test)]
pub(crate) use transport::tests::{MockResponse, MockTransport};
