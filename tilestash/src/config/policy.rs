//! Fetch policy and fetcher construction settings.

use std::path::PathBuf;
use std::time::Duration;

use crate::fetch::Freshness;

/// Entries younger than this are served without contacting the network.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(3 * 24 * 60 * 60);

/// Entries younger than this may stand in for a failed network request.
pub const DEFAULT_MAX_STALE: Duration = Duration::from_secs(90 * 24 * 60 * 60);

/// Default disk cache capacity (250 MiB).
pub const DEFAULT_CACHE_CAPACITY_BYTES: u64 = 250 * 1024 * 1024;

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Cache freshness limits and capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPolicy {
    pub max_age: Duration,
    pub max_stale: Duration,
    pub cache_capacity_bytes: u64,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            max_age: DEFAULT_MAX_AGE,
            max_stale: DEFAULT_MAX_STALE,
            cache_capacity_bytes: DEFAULT_CACHE_CAPACITY_BYTES,
        }
    }
}

impl FetchPolicy {
    /// Classifies a cached entry of the given age.
    pub fn freshness(&self, age: Duration) -> Freshness {
        if age <= self.max_age {
            Freshness::Fresh
        } else if age <= self.max_stale {
            Freshness::Stale
        } else {
            Freshness::Expired
        }
    }
}

/// Everything needed to build a [`CachingFetcher`](crate::fetch::CachingFetcher).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    pub policy: FetchPolicy,
    pub cache_directory: PathBuf,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            policy: FetchPolicy::default(),
            cache_directory: default_cache_directory(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            user_agent: default_user_agent(),
        }
    }
}

/// `tilestash/<version>`.
pub fn default_user_agent() -> String {
    format!("tilestash/{}", crate::VERSION)
}

/// Platform cache directory, e.g. `~/.cache/tilestash/tiles` on Linux.
///
/// Falls back to the system temp directory when no cache directory is known.
pub fn default_cache_directory() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("tilestash")
        .join("tiles")
}
