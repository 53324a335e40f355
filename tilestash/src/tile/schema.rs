//! Web Mercator (EPSG:3857) tiling scheme.

use crate::coord::{ZoomRange, MAX_ZOOM};

/// Tile edge length in pixels.
pub const TILE_SIZE: u32 = 256;

/// Screen resolution the scales are computed for.
pub const TILE_DPI: u32 = 96;

/// Spatial reference of the scheme.
pub const WEB_MERCATOR_WKID: u32 = 3857;

/// Half the width of the projected world in meters.
pub const WEB_MERCATOR_EXTENT: f64 = 20_037_508.342_78;

/// Ground resolution (meters per pixel) at each zoom level.
pub const RESOLUTIONS: [f64; MAX_ZOOM as usize + 1] = [
    156543.0339279998,
    78271.5169639999,
    39135.7584820001,
    19567.8792409999,
    9783.93962049996,
    4891.96981024998,
    2445.98490512499,
    1222.99245256249,
    611.49622628138,
    305.748113140558,
    152.874056570411,
    76.4370282850732,
    38.2185141425366,
    19.1092570712683,
    9.55462853563415,
    4.77731426794937,
    2.38865713397468,
    1.19432856685505,
    0.597164283559817,
    0.298582141647617,
    0.149291070823808,
    0.074645535411904,
    0.037322767705952,
    0.018661383985268,
];

/// Map scale denominator at each zoom level.
pub const SCALES: [f64; MAX_ZOOM as usize + 1] = [
    591657527.591555,
    295828763.795777,
    147914381.897889,
    73957190.948944,
    36978595.474472,
    18489297.737236,
    9244648.868618,
    4622324.434309,
    2311162.217155,
    1155581.108577,
    577790.554289,
    288895.277144,
    144447.638572,
    72223.819286,
    36111.909643,
    18055.954822,
    9027.977411,
    4513.988705,
    2256.994353,
    1128.497176,
    564.248588,
    282.124294,
    141.062147,
    70.531074,
];

/// Projected extent in meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

/// Tiling scheme published by a ready tile source.
#[derive(Debug, Clone, PartialEq)]
pub struct TileSchema {
    pub wkid: u32,
    /// Top-left corner of tile (0, 0) in projected meters.
    pub origin: (f64, f64),
    pub full_extent: Extent,
    /// One entry per level, starting at zoom 0.
    pub resolutions: Vec<f64>,
    /// One entry per level, starting at zoom 0.
    pub scales: Vec<f64>,
    pub dpi: u32,
    pub tile_width: u32,
    pub tile_height: u32,
}

impl TileSchema {
    /// Web Mercator schema with levels `0..=zoom_range.max`.
    ///
    /// Levels past the end of the resolution table are dropped.
    pub fn web_mercator(zoom_range: ZoomRange) -> Self {
        let levels = (zoom_range.max as usize + 1).min(RESOLUTIONS.len());
        Self {
            wkid: WEB_MERCATOR_WKID,
            origin: (-WEB_MERCATOR_EXTENT, WEB_MERCATOR_EXTENT),
            full_extent: Extent {
                x_min: -WEB_MERCATOR_EXTENT,
                y_min: -WEB_MERCATOR_EXTENT,
                x_max: WEB_MERCATOR_EXTENT,
                y_max: WEB_MERCATOR_EXTENT,
            },
            resolutions: RESOLUTIONS[..levels].to_vec(),
            scales: SCALES[..levels].to_vec(),
            dpi: TILE_DPI,
            tile_width: TILE_SIZE,
            tile_height: TILE_SIZE,
        }
    }

    pub fn levels(&self) -> usize {
        self.resolutions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolutions_halve_per_level() {
        for pair in RESOLUTIONS.windows(2) {
            let ratio = pair[0] / pair[1];
            assert!((ratio - 2.0).abs() < 1e-6, "ratio {}", ratio);
        }
    }

    #[test]
    fn test_level_zero_covers_world() {
        // 256 px at level 0 spans the whole projected width
        let width = RESOLUTIONS[0] * TILE_SIZE as f64;
        assert!((width - 2.0 * WEB_MERCATOR_EXTENT).abs() < 1.0);
    }

    #[test]
    fn test_schema_levels() {
        let schema = TileSchema::web_mercator(ZoomRange { min: 0, max: 18 });
        assert_eq!(schema.levels(), 19);
        assert_eq!(schema.scales.len(), 19);
        assert_eq!(schema.resolutions[18], RESOLUTIONS[18]);
        assert_eq!(schema.origin, (-WEB_MERCATOR_EXTENT, WEB_MERCATOR_EXTENT));
        assert_eq!(schema.wkid, 3857);
    }

    #[test]
    fn test_schema_full_table() {
        let schema = TileSchema::web_mercator(ZoomRange { min: 0, max: MAX_ZOOM });
        assert_eq!(schema.levels(), RESOLUTIONS.len());
    }

    #[test]
    fn test_schema_clamps_unvalidated_range() {
        let schema = TileSchema::web_mercator(ZoomRange { min: 0, max: 30 });
        assert_eq!(schema.levels(), RESOLUTIONS.len());
        assert_eq!(schema.scales.len(), SCALES.len());
    }
}
