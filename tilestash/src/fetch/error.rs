//! Fetch error types.

use thiserror::Error;

use super::transport::TransportError;

/// Why a tile could not be produced.
///
/// Every variant is a per-tile failure. The fetcher never retries on its own;
/// callers decide whether to try again later.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The network round-trip failed and no usable cached entry existed.
    #[error("Network failure fetching {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: TransportError,
    },

    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    /// The response lacked a body or a content type.
    #[error("Response from {url} has no {missing}")]
    NoContent { url: String, missing: &'static str },

    /// Offline and nothing cached for the URL.
    #[error("{url} is not cached and the network is unreachable")]
    NotCached { url: String },

    /// The caller stopped the fetch.
    #[error("Fetch of {url} was cancelled")]
    Cancelled { url: String },
}

impl FetchError {
    /// URL the failure refers to.
    pub fn url(&self) -> &str {
        match self {
            FetchError::Network { url, .. }
            | FetchError::HttpStatus { url, .. }
            | FetchError::NoContent { url, .. }
            | FetchError::NotCached { url }
            | FetchError::Cancelled { url } => url,
        }
    }
}

/// Convenience alias for fetch results.
pub type FetchResult<T> = Result<T, FetchError>;
