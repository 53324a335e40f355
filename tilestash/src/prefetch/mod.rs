//! Bulk tile prefetching for offline use.
//!
//! [`Prefetcher`] drives a batch of tile URLs through a shared
//! [`CachingFetcher`](crate::fetch::CachingFetcher) with bounded concurrency,
//! reporting [`PrefetchProgress`] over an mpsc channel and returning a
//! [`PrefetchReport`] when the batch ends.
//!
//! # Example
//!
//! ```ignore
//! use tilestash::prefetch::Prefetcher;
//! use tokio_util::sync::CancellationToken;
//!
//! let prefetcher = Prefetcher::new(fetcher, 8);
//! let (tx, mut rx) = tokio::sync::mpsc::channel(64);
//! let report = prefetcher.run_region(&generator, &region, zoom_range, tx, CancellationToken::new()).await?;
//! println!("{}", report);
//! ```

mod batch;
mod progress;

pub use batch::{PrefetchError, Prefetcher};
pub use progress::{PrefetchProgress, PrefetchReport};
