//! Batch prefetcher with a single-flight guard.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use futures::stream::{FuturesUnordered, StreamExt};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::progress::{PrefetchProgress, PrefetchReport};
use crate::coord::{AddressError, GeoBoundingBox, ZoomRange};
use crate::fetch::{CachingFetcher, FetchError};
use crate::tile::TileAddressGenerator;

/// Errors that prevent a batch from starting.
#[derive(Debug, Error, PartialEq)]
pub enum PrefetchError {
    /// Another batch is still running on this prefetcher.
    #[error("A prefetch batch is already running")]
    AlreadyRunning,

    /// The region or zoom range could not be turned into tile addresses.
    #[error(transparent)]
    Address(#[from] AddressError),
}

/// Fetches batches of tile URLs through a shared [`CachingFetcher`].
///
/// At most one batch runs at a time; a second `run` while one is active
/// returns [`PrefetchError::AlreadyRunning`]. Within a batch, up to
/// `concurrency` fetches are in flight. Failures are counted and never stop
/// the batch; only the cancellation token does.
pub struct Prefetcher {
    fetcher: Arc<CachingFetcher>,
    concurrency: usize,
    running: AtomicBool,
}

/// Clears the running flag when the batch ends, however it ends.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Prefetcher {
    pub fn new(fetcher: Arc<CachingFetcher>, concurrency: usize) -> Self {
        Self {
            fetcher,
            concurrency: concurrency.max(1),
            running: AtomicBool::new(false),
        }
    }

    /// True while a batch is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Prefetches every tile covering `region` across `zoom_range`.
    ///
    /// Tiles are visited zoom by zoom, coarse levels first. URLs are
    /// generated as the window advances, so memory stays bounded by the
    /// concurrency regardless of region size.
    pub async fn run_region(
        &self,
        generator: &TileAddressGenerator,
        region: &GeoBoundingBox,
        zoom_range: ZoomRange,
        progress_tx: mpsc::Sender<PrefetchProgress>,
        cancellation: CancellationToken,
    ) -> Result<PrefetchReport, PrefetchError> {
        let total = generator.url_count(region, zoom_range)?;
        let total = usize::try_from(total).unwrap_or(usize::MAX);
        let urls = generator
            .coords(region, zoom_range)?
            .map(|coord| generator.template().url(&coord));
        self.run_urls(urls, total, progress_tx, cancellation).await
    }

    /// Fetches `urls`, reporting progress through `progress_tx`.
    ///
    /// Progress is sent with backpressure; a dropped receiver is ignored.
    /// Cancelling the token stops scheduling new fetches and abandons the
    /// ones in flight.
    pub async fn run(
        &self,
        urls: Vec<String>,
        progress_tx: mpsc::Sender<PrefetchProgress>,
        cancellation: CancellationToken,
    ) -> Result<PrefetchReport, PrefetchError> {
        let total = urls.len();
        self.run_urls(urls.into_iter(), total, progress_tx, cancellation)
            .await
    }

    /// Drives the sliding window over `urls`, which yields `total` items.
    async fn run_urls(
        &self,
        mut urls: impl Iterator<Item = String>,
        total: usize,
        progress_tx: mpsc::Sender<PrefetchProgress>,
        cancellation: CancellationToken,
    ) -> Result<PrefetchReport, PrefetchError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Prefetch requested while a batch is already running");
            return Err(PrefetchError::AlreadyRunning);
        }
        let _guard = RunGuard(&self.running);

        let start = Instant::now();
        let mut report = PrefetchReport {
            requested: total,
            ..PrefetchReport::default()
        };

        info!(total, concurrency = self.concurrency, "Prefetch batch starting");
        let _ = progress_tx.send(PrefetchProgress::Starting { total }).await;

        let fetch_one = |url: String| {
            let fetcher = Arc::clone(&self.fetcher);
            let cancellation = cancellation.clone();
            async move {
                let result = fetcher.fetch_cancellable(&url, &cancellation).await;
                (url, result)
            }
        };

        // Sliding window of in-flight fetches
        let mut pending = FuturesUnordered::new();
        for url in urls.by_ref().take(self.concurrency) {
            pending.push(fetch_one(url));
        }

        while let Some((url, result)) = pending.next().await {
            match result {
                Ok(tile) if tile.origin.is_cached() => report.from_cache += 1,
                Ok(_) => report.from_network += 1,
                Err(FetchError::Cancelled { .. }) => {}
                Err(e) => {
                    debug!(url = %url, error = %e, "Prefetch tile failed");
                    report.failed += 1;
                }
            }

            if cancellation.is_cancelled() {
                report.stopped = true;
                break;
            }

            let _ = progress_tx
                .send(PrefetchProgress::TileDone {
                    completed: report.fetched(),
                    failed: report.failed,
                    total,
                })
                .await;

            if let Some(url) = urls.next() {
                pending.push(fetch_one(url));
            }
        }

        // Abandoned fetches release their response bodies here
        drop(pending);

        report.skipped = total.saturating_sub(report.fetched() + report.failed);
        report.elapsed = start.elapsed();

        if report.stopped {
            info!(
                completed = report.fetched(),
                pending = report.skipped,
                "Prefetch batch stopped"
            );
            let _ = progress_tx
                .send(PrefetchProgress::Cancelled {
                    completed: report.fetched(),
                    pending: report.skipped,
                })
                .await;
        } else {
            info!(
                network = report.from_network,
                cached = report.from_cache,
                failed = report.failed,
                elapsed_ms = report.elapsed.as_millis() as u64,
                "Prefetch batch complete"
            );
            let _ = progress_tx
                .send(PrefetchProgress::Complete {
                    completed: report.fetched(),
                    failed: report.failed,
                })
                .await;
        }

        Ok(report)
    }
}
