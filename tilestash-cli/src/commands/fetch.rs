//! Fetch command - fetch a single tile through the cache.

use std::path::PathBuf;

use tilestash::fetch::{fingerprint, probe_target};

use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the fetch command.
pub struct FetchArgs {
    pub url: String,
    pub output: Option<PathBuf>,
    pub offline: bool,
    pub verbose: bool,
}

/// Run the fetch command.
pub async fn run(args: FetchArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(args.verbose)?;
    runner.log_startup("fetch");

    let reachability_target = reachability_url(&args.url, &runner.config().tiles.base_url);
    let reachability = runner.reachability(args.offline, reachability_target).await;
    let fetcher = runner.create_fetcher(reachability).await?;

    let start = std::time::Instant::now();
    let tile = fetcher.fetch(&args.url).await?;
    let elapsed = start.elapsed();

    println!("URL:          {}", args.url);
    println!("Fingerprint:  {}", fingerprint(&args.url));
    println!("Origin:       {}", tile.origin);
    println!("Content type: {}", tile.content_type);
    println!("Size:         {} bytes", tile.bytes.len());
    println!("Time:         {:.2}s", elapsed.as_secs_f64());

    if let Some(path) = args.output {
        std::fs::write(&path, &tile.bytes).map_err(|e| CliError::FileWrite {
            path: path.display().to_string(),
            error: e,
        })?;
        println!();
        println!("✓ Saved to {}", path.display());
    }

    Ok(())
}

/// URL whose host decides between network and cache-only.
///
/// The tile's own server, or the configured server if the tile URL has no
/// usable host.
fn reachability_url<'a>(tile_url: &'a str, configured_base: &'a str) -> &'a str {
    if probe_target(tile_url).is_some() {
        tile_url
    } else {
        configured_base
    }
}

/// Print the fingerprint used to correlate a URL in the logs.
pub fn run_fingerprint(url: &str) -> Result<(), CliError> {
    println!("{}", fingerprint(url));
    Ok(())
}
