//! Coordinate types for slippy-map tiling.

use std::fmt;

use thiserror::Error;

/// Maximum latitude representable in Web Mercator (degrees).
pub const MAX_LAT: f64 = 85.05112878;

/// Minimum latitude representable in Web Mercator (degrees).
pub const MIN_LAT: f64 = -85.05112878;

/// Minimum longitude (degrees).
pub const MIN_LON: f64 = -180.0;

/// Maximum longitude (degrees).
pub const MAX_LON: f64 = 180.0;

/// Lowest supported zoom level.
pub const MIN_ZOOM: u8 = 0;

/// Highest supported zoom level.
///
/// Bounded by the length of the resolution/scale table in
/// [`crate::tile::TileSchema`].
pub const MAX_ZOOM: u8 = 23;

/// Errors raised for invalid tile-addressing inputs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AddressError {
    /// The region is not a valid bounding box.
    #[error("Invalid region: {0}")]
    InvalidRegion(String),

    /// The zoom range is inverted or outside the supported levels.
    #[error("Invalid zoom range {min}..={max} (supported: {MIN_ZOOM}..={MAX_ZOOM})")]
    InvalidRange { min: u8, max: u8 },
}

/// A geographic bounding box in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBoundingBox {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl GeoBoundingBox {
    /// Creates a bounding box from its four edges.
    pub fn new(min_lat: f64, min_lon: f64, max_lat: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            min_lon,
            max_lat,
            max_lon,
        }
    }

    /// Creates a degenerate bounding box covering a single point.
    pub fn point(lat: f64, lon: f64) -> Self {
        Self::new(lat, lon, lat, lon)
    }

    /// Computes the envelope of a sequence of `(lat, lon)` vertices.
    ///
    /// Returns `None` when the sequence is empty.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut iter = points.into_iter();
        let (lat, lon) = iter.next()?;
        let mut bbox = Self::point(lat, lon);
        for (lat, lon) in iter {
            bbox.min_lat = bbox.min_lat.min(lat);
            bbox.max_lat = bbox.max_lat.max(lat);
            bbox.min_lon = bbox.min_lon.min(lon);
            bbox.max_lon = bbox.max_lon.max(lon);
        }
        Some(bbox)
    }

    /// Clamps the box into the Web Mercator domain and validates it.
    ///
    /// Latitudes are clamped to [`MIN_LAT`, `MAX_LAT`] and longitudes to
    /// [`MIN_LON`, `MAX_LON`]. Non-finite edges or inverted bounds are
    /// rejected.
    pub fn normalized(&self) -> Result<Self, AddressError> {
        let edges = [self.min_lat, self.min_lon, self.max_lat, self.max_lon];
        if edges.iter().any(|v| !v.is_finite()) {
            return Err(AddressError::InvalidRegion(format!(
                "non-finite coordinate in {}",
                self
            )));
        }

        let bbox = Self {
            min_lat: self.min_lat.clamp(MIN_LAT, MAX_LAT),
            min_lon: self.min_lon.clamp(MIN_LON, MAX_LON),
            max_lat: self.max_lat.clamp(MIN_LAT, MAX_LAT),
            max_lon: self.max_lon.clamp(MIN_LON, MAX_LON),
        };

        if bbox.min_lat > bbox.max_lat {
            return Err(AddressError::InvalidRegion(format!(
                "min_lat {} > max_lat {}",
                bbox.min_lat, bbox.max_lat
            )));
        }
        if bbox.min_lon > bbox.max_lon {
            return Err(AddressError::InvalidRegion(format!(
                "min_lon {} > max_lon {}",
                bbox.min_lon, bbox.max_lon
            )));
        }

        Ok(bbox)
    }
}

impl fmt::Display for GeoBoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}, {}, {}]",
            self.min_lat, self.min_lon, self.max_lat, self.max_lon
        )
    }
}

/// An inclusive range of zoom levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ZoomRange {
    pub min: u8,
    pub max: u8,
}

impl ZoomRange {
    /// Creates a validated zoom range.
    pub fn new(min: u8, max: u8) -> Result<Self, AddressError> {
        let range = Self { min, max };
        range.validate()?;
        Ok(range)
    }

    /// A range containing a single zoom level.
    pub fn single(zoom: u8) -> Result<Self, AddressError> {
        Self::new(zoom, zoom)
    }

    /// Checks `min <= max` and both ends lie in [`MIN_ZOOM`, `MAX_ZOOM`].
    pub fn validate(&self) -> Result<(), AddressError> {
        if self.min > self.max || self.max > MAX_ZOOM {
            return Err(AddressError::InvalidRange {
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }

    /// Iterates the zoom levels in ascending order.
    pub fn levels(&self) -> impl Iterator<Item = u8> {
        self.min..=self.max
    }

    /// Returns true if `zoom` lies within the range.
    pub fn contains(&self, zoom: u8) -> bool {
        (self.min..=self.max).contains(&zoom)
    }
}

/// Address of one raster tile in the slippy-map scheme.
///
/// `col` grows eastward and `row` grows southward; both lie in
/// `[0, 2^zoom)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    pub zoom: u8,
    pub col: u32,
    pub row: u32,
}

impl TileCoord {
    /// Creates a tile coordinate without validation.
    pub fn new(zoom: u8, col: u32, row: u32) -> Self {
        Self { zoom, col, row }
    }

    /// Returns true if column and row fall inside the grid for this zoom.
    pub fn is_valid(&self) -> bool {
        if self.zoom > MAX_ZOOM {
            return false;
        }
        let n = tiles_per_side(self.zoom);
        self.col < n && self.row < n
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.col, self.row)
    }
}

/// Number of tiles along one side of the grid at `zoom`.
///
/// Zoom levels past [`MAX_ZOOM`] are treated as [`MAX_ZOOM`].
#[inline]
pub fn tiles_per_side(zoom: u8) -> u32 {
    1u32 << zoom.min(MAX_ZOOM)
}
