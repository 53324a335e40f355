//! Prefetch command - download every tile of a region for offline use.

use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use tilestash::config::format_size;
use tilestash::prefetch::{PrefetchProgress, Prefetcher};

use super::common::RegionArgs;
use crate::error::CliError;
use crate::runner::CliRunner;

/// Progress events buffered between the batch and the progress bar.
const PROGRESS_CHANNEL_CAPACITY: usize = 256;

/// Arguments for the prefetch command.
pub struct PrefetchArgs {
    pub region: RegionArgs,
    pub parallel: Option<usize>,
    pub offline: bool,
    pub verbose: bool,
}

/// Run the prefetch command.
pub async fn run(args: PrefetchArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(args.verbose)?;
    runner.log_startup("prefetch");
    let config = runner.config();

    let zoom_range = args.region.zoom_range(config)?;
    let generator = args.region.generator(config);
    let parallel = args.parallel.unwrap_or(config.download.parallel).max(1);
    let total = generator.url_count(&args.region.bbox, zoom_range)?;

    println!("TileStash Prefetch v{}", tilestash::VERSION);
    println!("======================");
    println!();
    println!("Region:   {}", args.region.bbox);
    println!("Zoom:     {}-{}", zoom_range.min, zoom_range.max);
    println!("Server:   {}", generator.template().base_url());
    println!("Tiles:    {}", total);
    println!("Parallel: {}", parallel);
    println!(
        "Cache:    {} (limit {})",
        config.cache.directory.display(),
        format_size(config.cache.size)
    );
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let reachability = runner
        .reachability(args.offline, generator.template().base_url())
        .await;
    let fetcher = Arc::new(runner.create_fetcher(reachability).await?);

    // Set up signal handler for graceful shutdown
    let cancellation = CancellationToken::new();
    let signal_token = cancellation.clone();
    ctrlc::set_handler(move || {
        eprintln!();
        eprintln!("Received stop signal, finishing...");
        signal_token.cancel();
    })
    .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;

    let (progress_tx, progress_rx) = mpsc::channel(PROGRESS_CHANNEL_CAPACITY);
    let progress_task = tokio::spawn(render_progress(progress_rx));

    let prefetcher = Prefetcher::new(fetcher, parallel);
    let result = prefetcher
        .run_region(
            &generator,
            &args.region.bbox,
            zoom_range,
            progress_tx,
            cancellation,
        )
        .await;
    let _ = progress_task.await;
    let report = result?;

    info!(report = %report, "Prefetch finished");
    println!();
    println!("Prefetch Summary");
    println!("────────────────");
    println!("  Requested:    {}", report.requested);
    println!("  Downloaded:   {}", report.from_network);
    println!("  From cache:   {}", report.from_cache);
    println!("  Failed:       {}", report.failed);
    if report.stopped {
        println!("  Not fetched:  {} (stopped)", report.skipped);
    }
    println!("  Elapsed:      {:.1}s", report.elapsed.as_secs_f64());

    if report.failed > 0 {
        println!();
        println!("Some tiles failed; see the log for details. Re-run to retry them.");
    }

    Ok(())
}

/// Drive a progress bar from batch events until the channel closes.
async fn render_progress(mut rx: mpsc::Receiver<PrefetchProgress>) {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-"),
    );

    while let Some(event) = rx.recv().await {
        match event {
            PrefetchProgress::Starting { total } => bar.set_length(total as u64),
            PrefetchProgress::TileDone {
                completed, failed, ..
            } => {
                bar.set_position((completed + failed) as u64);
                if failed > 0 {
                    bar.set_message(format!("{} failed", failed));
                }
            }
            PrefetchProgress::Complete { .. } => bar.finish_with_message("done"),
            PrefetchProgress::Cancelled { pending, .. } => {
                bar.abandon_with_message(format!("stopped, {} not fetched", pending))
            }
        }
    }
}
