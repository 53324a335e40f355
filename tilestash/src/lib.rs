//! TileStash - slippy-map tile addressing and offline-aware tile fetching
//!
//! This library converts geographic regions into Web Mercator tile
//! addresses and fetches those tiles through a persistent HTTP cache that
//! keeps serving stored tiles when the network is gone.
//!
//! # Modules
//!
//! - [`coord`]: latitude/longitude to tile coordinate math
//! - [`tile`]: URL generation, tiling schema and tile sources
//! - [`fetch`]: the caching fetcher and its transport seams
//! - [`cache`]: memory and disk cache stores
//! - [`prefetch`]: bulk downloads for offline use
//! - [`config`]: INI configuration and fetch policy
//! - [`logging`]: tracing setup

pub mod cache;
pub mod config;
pub mod coord;
pub mod fetch;
pub mod logging;
pub mod prefetch;
pub mod tile;

/// Crate version, used in the default User-Agent.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use coord::{GeoBoundingBox, TileCoord, ZoomRange};
pub use fetch::{CachingFetcher, FetchError, FetchedTile, TileOrigin};
pub use prefetch::{Prefetcher, PrefetchReport};
pub use tile::{TileAddressGenerator, TileUrlSet};
