//! Tile addressing, URL formatting and tile sources.
//!
//! - [`TileAddressGenerator`]: region + zoom range to a [`TileUrlSet`]
//! - [`TileUrlTemplate`]: `{base_url}/{zoom}/{col}/{row}.png`
//! - [`TileSchema`]: the Web Mercator tiling scheme
//! - [`TileSource`]: lifecycle-aware tile provider for map views

mod addresses;
mod schema;
mod source;
mod url;

pub use addresses::{TileAddressGenerator, TileCoverage};
pub use schema::{
    Extent, TileSchema, RESOLUTIONS, SCALES, TILE_DPI, TILE_SIZE, WEB_MERCATOR_EXTENT,
    WEB_MERCATOR_WKID,
};
pub use source::{SourceError, SourceStatus, StreamingTileSource, TileSource};
pub use url::{TileUrlSet, TileUrlTemplate, DEFAULT_BASE_URL};
