//! Region to tile-address conversion.
//!
//! [`TileAddressGenerator`] turns a geographic bounding box and a zoom range
//! into the set of tile URLs needed to cover it. All variants go through
//! [`TileCoverage`], the per-zoom column/row rectangle, so counting and
//! enumeration always agree.

use tracing::debug;

use super::url::{TileUrlSet, TileUrlTemplate};
use crate::coord::{col_span, row_span, AddressError, GeoBoundingBox, TileCoord, ZoomRange};

/// Tiles covering a region at one zoom level.
///
/// Columns and rows are inclusive bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileCoverage {
    pub zoom: u8,
    pub min_col: u32,
    pub max_col: u32,
    pub min_row: u32,
    pub max_row: u32,
}

impl TileCoverage {
    /// Coverage of a normalized region at `zoom`.
    ///
    /// The northern edge (`max_lat`) gives the smallest row. East and south
    /// edges lying exactly on a tile boundary do not add the tile beyond it,
    /// so the bounds of a tile cover exactly that tile.
    pub fn for_region(region: &GeoBoundingBox, zoom: u8) -> Self {
        let (min_col, max_col) = col_span(region.min_lon, region.max_lon, zoom);
        let (min_row, max_row) = row_span(region.min_lat, region.max_lat, zoom);
        Self {
            zoom,
            min_col,
            max_col,
            min_row,
            max_row,
        }
    }

    /// Number of tiles in the rectangle.
    pub fn tile_count(&self) -> u64 {
        let cols = (self.max_col - self.min_col) as u64 + 1;
        let rows = (self.max_row - self.min_row) as u64 + 1;
        cols * rows
    }

    /// Iterates the tiles column by column, rows ascending within a column.
    pub fn tiles(&self) -> impl Iterator<Item = TileCoord> {
        let Self {
            zoom,
            min_col,
            max_col,
            min_row,
            max_row,
        } = *self;
        (min_col..=max_col)
            .flat_map(move |col| (min_row..=max_row).map(move |row| TileCoord { zoom, col, row }))
    }

    pub fn contains(&self, coord: &TileCoord) -> bool {
        coord.zoom == self.zoom
            && (self.min_col..=self.max_col).contains(&coord.col)
            && (self.min_row..=self.max_row).contains(&coord.row)
    }
}

/// Converts regions and zoom ranges into tile URLs.
#[derive(Debug, Clone, Default)]
pub struct TileAddressGenerator {
    template: TileUrlTemplate,
}

impl TileAddressGenerator {
    pub fn new(template: TileUrlTemplate) -> Self {
        Self { template }
    }

    /// Generator for tiles served from `base_url`.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self::new(TileUrlTemplate::new(base_url))
    }

    pub fn template(&self) -> &TileUrlTemplate {
        &self.template
    }

    /// Per-zoom coverage of `region`, in ascending zoom order.
    ///
    /// # Errors
    ///
    /// [`AddressError::InvalidRange`] for an inverted or unsupported zoom
    /// range, [`AddressError::InvalidRegion`] for an inverted or non-finite
    /// region.
    pub fn coverage(
        &self,
        region: &GeoBoundingBox,
        zoom_range: ZoomRange,
    ) -> Result<Vec<TileCoverage>, AddressError> {
        zoom_range.validate()?;
        let region = region.normalized()?;
        Ok(zoom_range
            .levels()
            .map(|zoom| TileCoverage::for_region(&region, zoom))
            .collect())
    }

    /// Lazily enumerates the tile coordinates covering `region`.
    ///
    /// Order: zoom ascending, then column, then row.
    pub fn coords(
        &self,
        region: &GeoBoundingBox,
        zoom_range: ZoomRange,
    ) -> Result<impl Iterator<Item = TileCoord>, AddressError> {
        let coverage = self.coverage(region, zoom_range)?;
        Ok(coverage.into_iter().flat_map(|c| c.tiles()))
    }

    /// All tile URLs covering `region` across `zoom_range`.
    pub fn urls(
        &self,
        region: &GeoBoundingBox,
        zoom_range: ZoomRange,
    ) -> Result<TileUrlSet, AddressError> {
        let coverage = self.coverage(region, zoom_range)?;
        let total: u64 = coverage.iter().map(TileCoverage::tile_count).sum();

        let mut urls = TileUrlSet::with_capacity(total.min(1 << 20) as usize);
        urls.extend(
            coverage
                .iter()
                .flat_map(|c| c.tiles())
                .map(|coord| self.template.url(&coord)),
        );

        debug!(region = %region, min_zoom = zoom_range.min, max_zoom = zoom_range.max, count = urls.len(), "Generated tile URLs");
        Ok(urls)
    }

    /// Like [`urls`](Self::urls) but stops once `limit` URLs are produced.
    ///
    /// The partial set is deterministic: the first `limit` tiles in
    /// zoom, column, row order.
    pub fn urls_bounded(
        &self,
        region: &GeoBoundingBox,
        zoom_range: ZoomRange,
        limit: usize,
    ) -> Result<TileUrlSet, AddressError> {
        let urls = self
            .coords(region, zoom_range)?
            .take(limit)
            .map(|coord| self.template.url(&coord))
            .collect();
        Ok(urls)
    }

    /// Number of URLs [`urls`](Self::urls) would return, without building them.
    pub fn url_count(
        &self,
        region: &GeoBoundingBox,
        zoom_range: ZoomRange,
    ) -> Result<u64, AddressError> {
        let coverage = self.coverage(region, zoom_range)?;
        Ok(coverage.iter().map(TileCoverage::tile_count).sum())
    }

    /// Union of the URL sets of several regions.
    pub fn urls_for_regions(
        &self,
        regions: &[GeoBoundingBox],
        zoom_range: ZoomRange,
    ) -> Result<TileUrlSet, AddressError> {
        zoom_range.validate()?;
        let mut urls = TileUrlSet::new();
        for region in regions {
            urls.extend_from(self.urls(region, zoom_range)?);
        }
        Ok(urls)
    }
}
