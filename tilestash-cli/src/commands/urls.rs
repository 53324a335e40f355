//! Urls and count commands - list or count the tiles covering a region.

use tilestash::config::format_size_approx;

use super::common::{load_config, RegionArgs};
use crate::error::CliError;

/// Rough average size of an OpenStreetMap PNG tile.
const AVERAGE_TILE_BYTES: u64 = 15 * 1024;

/// Print every tile URL covering the region, one per line.
pub fn run_urls(region: RegionArgs, limit: Option<usize>) -> Result<(), CliError> {
    let config = load_config();
    let zoom_range = region.zoom_range(&config)?;
    let generator = region.generator(&config);

    let urls = match limit {
        Some(limit) => generator.urls_bounded(&region.bbox, zoom_range, limit)?,
        None => generator.urls(&region.bbox, zoom_range)?,
    };

    for url in urls.into_sorted_vec() {
        println!("{}", url);
    }
    Ok(())
}

/// Print per-zoom tile counts and the total.
pub fn run_count(region: RegionArgs) -> Result<(), CliError> {
    let config = load_config();
    let zoom_range = region.zoom_range(&config)?;
    let generator = region.generator(&config);

    println!("Region: {}", region.bbox);
    println!();
    for coverage in generator.coverage(&region.bbox, zoom_range)? {
        println!(
            "  Zoom {:>2}: {:>10} tiles  (cols {}-{}, rows {}-{})",
            coverage.zoom,
            coverage.tile_count(),
            coverage.min_col,
            coverage.max_col,
            coverage.min_row,
            coverage.max_row
        );
    }

    let total = generator.url_count(&region.bbox, zoom_range)?;
    println!();
    println!("Total: {} tiles", total);
    println!(
        "Estimated download: ~{}",
        format_size_approx(total.saturating_mul(AVERAGE_TILE_BYTES))
    );
    Ok(())
}
