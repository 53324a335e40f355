//! Coordinate conversion module
//!
//! Provides conversions between geographic coordinates (latitude/longitude)
//! and Web Mercator tile coordinates used by slippy-map tile servers.
//!
//! Projected positions within a hair of a tile edge are snapped onto it, so
//! the corners returned by [`tile_to_lat_lon`] convert back to the same
//! tile.

mod types;

pub use types::{
    tiles_per_side, AddressError, GeoBoundingBox, TileCoord, ZoomRange, MAX_LAT, MAX_LON,
    MAX_ZOOM, MIN_LAT, MIN_LON, MIN_ZOOM,
};

use std::f64::consts::PI;

/// Distance (in tiles) within which a projected coordinate is treated as
/// lying exactly on a tile edge. Grows with the grid so the projection's
/// rounding error at deep zoom levels stays inside it.
#[inline]
fn edge_tolerance(n: u32) -> f64 {
    1e-9_f64.max(n as f64 * 1e-12)
}

/// Snaps `value` to the nearest integer if it is within the edge tolerance.
#[inline]
fn snap_to_edge(value: f64, n: u32) -> f64 {
    let nearest = value.round();
    if (value - nearest).abs() <= edge_tolerance(n) {
        nearest
    } else {
        value
    }
}

/// Projects a longitude onto the tile grid at `zoom`, in fractional tiles.
#[inline]
pub fn lon_to_x(lon: f64, zoom: u8) -> f64 {
    let n = tiles_per_side(zoom);
    snap_to_edge((lon + 180.0) / 360.0 * n as f64, n)
}

/// Projects a latitude onto the tile grid at `zoom`, in fractional tiles,
/// using the inverse Web Mercator projection.
///
/// Rows increase southward, so northern latitudes produce smaller values.
#[inline]
pub fn lat_to_y(lat: f64, zoom: u8) -> f64 {
    let n = tiles_per_side(zoom);
    let lat_rad = lat * PI / 180.0;
    // asinh(tan φ) == ln(tan φ + sec φ)
    snap_to_edge((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n as f64, n)
}

/// Converts a longitude to the tile column containing it at `zoom`.
///
/// The result is clamped to the grid so that `lon = 180` maps to the last
/// column instead of one past it.
#[inline]
pub fn lon_to_col(lon: f64, zoom: u8) -> u32 {
    clamp_index(lon_to_x(lon, zoom).floor(), tiles_per_side(zoom))
}

/// Converts a latitude to the tile row containing it at `zoom`.
#[inline]
pub fn lat_to_row(lat: f64, zoom: u8) -> u32 {
    clamp_index(lat_to_y(lat, zoom).floor(), tiles_per_side(zoom))
}

/// Inclusive column range covered by `[min_lon, max_lon]` at `zoom`.
///
/// The east edge is half-open: a `max_lon` lying exactly on a tile edge
/// does not pull in the column beyond it.
pub fn col_span(min_lon: f64, max_lon: f64, zoom: u8) -> (u32, u32) {
    let n = tiles_per_side(zoom);
    let first = clamp_index(lon_to_x(min_lon, zoom).floor(), n);
    let last = clamp_index(lon_to_x(max_lon, zoom).ceil() - 1.0, n);
    (first, last.max(first))
}

/// Inclusive row range covered by `[min_lat, max_lat]` at `zoom`.
///
/// The northern edge gives the first row. The south edge is half-open, as
/// in [`col_span`].
pub fn row_span(min_lat: f64, max_lat: f64, zoom: u8) -> (u32, u32) {
    let n = tiles_per_side(zoom);
    let first = clamp_index(lat_to_y(max_lat, zoom).floor(), n);
    let last = clamp_index(lat_to_y(min_lat, zoom).ceil() - 1.0, n);
    (first, last.max(first))
}

#[inline]
fn clamp_index(value: f64, n: u32) -> u32 {
    if value.is_nan() || value <= 0.0 {
        0
    } else if value >= (n - 1) as f64 {
        n - 1
    } else {
        value as u32
    }
}

/// Converts geographic coordinates to the tile containing them.
///
/// # Errors
///
/// Returns [`AddressError::InvalidRegion`] for non-finite input and
/// [`AddressError::InvalidRange`] for an unsupported zoom level.
pub fn to_tile_coords(lat: f64, lon: f64, zoom: u8) -> Result<TileCoord, AddressError> {
    ZoomRange::single(zoom)?;
    let point = GeoBoundingBox::point(lat, lon).normalized()?;
    Ok(TileCoord {
        zoom,
        col: lon_to_col(point.min_lon, zoom),
        row: lat_to_row(point.max_lat, zoom),
    })
}

/// Converts tile coordinates back to geographic coordinates.
///
/// Returns the latitude/longitude of the tile's northwest corner.
#[inline]
pub fn tile_to_lat_lon(tile: &TileCoord) -> (f64, f64) {
    let n = tiles_per_side(tile.zoom) as f64;

    let lon = tile.col as f64 / n * 360.0 - 180.0;

    let y = tile.row as f64 / n;
    let lat_rad = (PI * (1.0 - 2.0 * y)).sinh().atan();
    let lat = lat_rad * 180.0 / PI;

    (lat, lon)
}

/// Returns the geographic bounds of a tile.
pub fn tile_bounds(tile: &TileCoord) -> GeoBoundingBox {
    let (max_lat, min_lon) = tile_to_lat_lon(tile);
    let (min_lat, max_lon) = tile_to_lat_lon(&TileCoord {
        zoom: tile.zoom,
        col: tile.col + 1,
        row: tile.row + 1,
    });
    GeoBoundingBox::new(min_lat, min_lon, max_lat, max_lon)
}
