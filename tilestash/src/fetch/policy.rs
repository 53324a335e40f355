//! Request cache policies and entry freshness.

use std::fmt;
use std::time::Duration;

use crate::config::FetchPolicy;

/// `max-stale` sent with cache-only requests; accepts an entry of any age.
pub const UNBOUNDED_MAX_STALE_SECS: u64 = i32::MAX as u64;

/// Cache directive attached to a tile request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Online: prefer the network, tolerate cached entries up to the limits.
    NetworkPreferred { max_age: Duration, max_stale: Duration },
    /// Offline: serve from cache only, regardless of age.
    CacheOnly,
}

impl CachePolicy {
    /// Selects the policy for the current reachability state.
    pub fn for_reachability(reachable: bool, policy: &FetchPolicy) -> Self {
        if reachable {
            CachePolicy::NetworkPreferred {
                max_age: policy.max_age,
                max_stale: policy.max_stale,
            }
        } else {
            CachePolicy::CacheOnly
        }
    }

    /// Value of the `Cache-Control` request header.
    pub fn header_value(&self) -> String {
        match self {
            CachePolicy::NetworkPreferred { max_age, max_stale } => format!(
                "max-age={}, max-stale={}",
                max_age.as_secs(),
                max_stale.as_secs()
            ),
            CachePolicy::CacheOnly => {
                format!("only-if-cached, max-stale={}", UNBOUNDED_MAX_STALE_SECS)
            }
        }
    }

    /// Returns true if the network may be contacted.
    pub fn allows_network(&self) -> bool {
        matches!(self, CachePolicy::NetworkPreferred { .. })
    }
}

impl fmt::Display for CachePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.header_value())
    }
}

/// How usable a cached entry is, given its age.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Age at most `max_age`: served without contacting the network.
    Fresh,
    /// Age at most `max_stale`: served only when the network fails.
    Stale,
    /// Older than `max_stale`: served only while offline.
    Expired,
}
