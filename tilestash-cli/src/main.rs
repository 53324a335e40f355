//! TileStash CLI - Command-line interface
//!
//! Computes slippy-map tile URLs for a region and prefetches them into the
//! offline tile cache.

mod commands;
mod error;
mod runner;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::cache::CacheAction;
use commands::common::RegionArgs;
use commands::fetch::FetchArgs;
use commands::prefetch::PrefetchArgs;

#[derive(Parser)]
#[command(name = "tilestash")]
#[command(version, about = "Slippy-map tile addressing and offline tile cache", long_about = None)]
struct Cli {
    /// Echo debug logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the configuration file with default settings
    Init,

    /// List the tile URLs covering a region
    Urls {
        #[command(flatten)]
        region: RegionArgs,

        /// Stop after this many URLs
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Count the tiles covering a region
    Count {
        #[command(flatten)]
        region: RegionArgs,
    },

    /// Fetch a single tile through the cache
    Fetch {
        /// Tile URL
        url: String,

        /// Write the tile to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Serve from cache only, never touch the network
        #[arg(long)]
        offline: bool,
    },

    /// Download every tile of a region into the cache
    Prefetch {
        #[command(flatten)]
        region: RegionArgs,

        /// Concurrent downloads (default from config)
        #[arg(long)]
        parallel: Option<usize>,

        /// Serve from cache only, never touch the network
        #[arg(long)]
        offline: bool,
    },

    /// Print the log fingerprint of a URL
    Fingerprint {
        /// Tile URL
        url: String,
    },

    /// Manage the tile cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let verbose = cli.verbose;

    let result = match cli.command {
        Commands::Init => commands::init::run(),
        Commands::Urls { region, limit } => commands::urls::run_urls(region, limit),
        Commands::Count { region } => commands::urls::run_count(region),
        Commands::Fetch {
            url,
            output,
            offline,
        } => {
            commands::fetch::run(FetchArgs {
                url,
                output,
                offline,
                verbose,
            })
            .await
        }
        Commands::Prefetch {
            region,
            parallel,
            offline,
        } => {
            commands::prefetch::run(PrefetchArgs {
                region,
                parallel,
                offline,
                verbose,
            })
            .await
        }
        Commands::Fingerprint { url } => commands::fetch::run_fingerprint(&url),
        Commands::Cache { action } => commands::cache::run(action).await,
    };

    if let Err(e) = result {
        e.exit();
    }
}
