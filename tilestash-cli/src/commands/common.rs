//! Common types and utilities shared across CLI commands.

use clap::Args;
use tilestash::config::ConfigFile;
use tilestash::coord::{GeoBoundingBox, ZoomRange};
use tilestash::tile::TileAddressGenerator;

use crate::error::CliError;

/// Region selection shared by `urls`, `count` and `prefetch`.
#[derive(Debug, Clone, Args)]
pub struct RegionArgs {
    /// Bounding box as MIN_LAT,MIN_LON,MAX_LAT,MAX_LON in decimal degrees
    #[arg(long, value_parser = parse_bbox, allow_hyphen_values = true)]
    pub bbox: GeoBoundingBox,

    /// Lowest zoom level (default from config, 1)
    #[arg(long)]
    pub min_zoom: Option<u8>,

    /// Highest zoom level (default from config, 18)
    #[arg(long)]
    pub max_zoom: Option<u8>,

    /// Tile server base URL (default from config)
    #[arg(long)]
    pub base_url: Option<String>,
}

impl RegionArgs {
    /// Resolve the zoom range: CLI takes precedence, then config.
    pub fn zoom_range(&self, config: &ConfigFile) -> Result<ZoomRange, CliError> {
        let configured = config.zoom_range();
        let min = self.min_zoom.unwrap_or(configured.min);
        let max = self.max_zoom.unwrap_or(configured.max);
        Ok(ZoomRange::new(min, max)?)
    }

    /// Resolve the base URL: CLI takes precedence, then config.
    pub fn base_url<'a>(&'a self, config: &'a ConfigFile) -> &'a str {
        self.base_url.as_deref().unwrap_or(&config.tiles.base_url)
    }

    pub fn generator(&self, config: &ConfigFile) -> TileAddressGenerator {
        TileAddressGenerator::with_base_url(self.base_url(config))
    }
}

/// Parse `MIN_LAT,MIN_LON,MAX_LAT,MAX_LON`.
pub fn parse_bbox(s: &str) -> Result<GeoBoundingBox, String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 4 {
        return Err(format!(
            "expected MIN_LAT,MIN_LON,MAX_LAT,MAX_LON, got {} value(s)",
            parts.len()
        ));
    }

    let mut values = [0.0f64; 4];
    for (value, part) in values.iter_mut().zip(&parts) {
        *value = part
            .parse()
            .map_err(|_| format!("'{}' is not a number", part))?;
    }

    let [min_lat, min_lon, max_lat, max_lon] = values;
    if min_lat > max_lat || min_lon > max_lon {
        return Err("minimum corner must be south-west of maximum corner".to_string());
    }
    Ok(GeoBoundingBox::new(min_lat, min_lon, max_lat, max_lon))
}

/// Load the config file, falling back to defaults if it is unreadable.
pub fn load_config() -> ConfigFile {
    ConfigFile::load().unwrap_or_else(|e| {
        eprintln!("Warning: {}; using defaults", e);
        ConfigFile::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bbox() {
        let bbox = parse_bbox("53.5, 9.9, 53.6, 10.1").unwrap();
        assert_eq!(bbox, GeoBoundingBox::new(53.5, 9.9, 53.6, 10.1));
    }

    #[test]
    fn test_parse_bbox_negative() {
        let bbox = parse_bbox("-34.0,-58.5,-33.9,-58.3").unwrap();
        assert_eq!(bbox.min_lat, -34.0);
        assert_eq!(bbox.min_lon, -58.5);
    }

    #[test]
    fn test_parse_bbox_wrong_arity() {
        assert!(parse_bbox("1,2,3").is_err());
        assert!(parse_bbox("1,2,3,4,5").is_err());
    }

    #[test]
    fn test_parse_bbox_not_a_number() {
        let err = parse_bbox("1,north,3,4").unwrap_err();
        assert!(err.contains("north"));
    }

    #[test]
    fn test_parse_bbox_inverted() {
        assert!(parse_bbox("10,0,5,1").is_err());
    }

    #[test]
    fn test_zoom_range_cli_overrides_config() {
        let args = RegionArgs {
            bbox: GeoBoundingBox::point(0.0, 0.0),
            min_zoom: Some(3),
            max_zoom: None,
            base_url: None,
        };
        let config = ConfigFile::default();
        let range = args.zoom_range(&config).unwrap();
        assert_eq!(range.min, 3);
        assert_eq!(range.max, config.tiles.max_zoom);
    }

    #[test]
    fn test_zoom_range_invalid() {
        let args = RegionArgs {
            bbox: GeoBoundingBox::point(0.0, 0.0),
            min_zoom: Some(10),
            max_zoom: Some(2),
            base_url: None,
        };
        assert!(matches!(
            args.zoom_range(&ConfigFile::default()),
            Err(CliError::Address(_))
        ));
    }

    #[test]
    fn test_base_url_override() {
        let args = RegionArgs {
            bbox: GeoBoundingBox::point(0.0, 0.0),
            min_zoom: None,
            max_zoom: None,
            base_url: Some("https://tiles.example.com".to_string()),
        };
        let config = ConfigFile::default();
        assert_eq!(args.base_url(&config), "https://tiles.example.com");
    }
}
