//! Progress events and the final report of a prefetch batch.

use std::fmt;
use std::time::Duration;

/// Progress update sent while a batch runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefetchProgress {
    /// Batch accepted.
    Starting { total: usize },

    /// One more tile finished, successfully or not.
    TileDone {
        completed: usize,
        failed: usize,
        total: usize,
    },

    /// Every tile was attempted.
    Complete { completed: usize, failed: usize },

    /// The stop signal ended the batch early.
    Cancelled { completed: usize, pending: usize },
}

/// Outcome of a prefetch batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefetchReport {
    /// URLs in the batch.
    pub requested: usize,
    /// Tiles downloaded from the network.
    pub from_network: usize,
    /// Tiles answered from the cache (fresh, stale, revalidated or offline).
    pub from_cache: usize,
    /// Tiles that failed.
    pub failed: usize,
    /// Tiles never attempted or abandoned because of the stop signal.
    pub skipped: usize,
    /// True if the stop signal ended the batch.
    pub stopped: bool,
    pub elapsed: Duration,
}

impl PrefetchReport {
    /// Tiles obtained from any origin.
    pub fn fetched(&self) -> usize {
        self.from_network + self.from_cache
    }
}

impl fmt::Display for PrefetchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} tiles ({} network, {} cached), {} failed, {} skipped in {:.1}s",
            self.fetched(),
            self.requested,
            self.from_network,
            self.from_cache,
            self.failed,
            self.skipped,
            self.elapsed.as_secs_f64()
        )?;
        if self.stopped {
            write!(f, " (stopped)")?;
        }
        Ok(())
    }
}
