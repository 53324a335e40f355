//! Cache management CLI commands.

use clap::Subcommand;
use tilestash::cache::{CacheStore, DiskCacheStore};
use tilestash::config::format_size;
use tilestash::fetch::fingerprint;

use super::common::load_config;
use crate::error::CliError;

/// Cache action subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Show disk cache statistics
    Stats,
    /// Clear the disk cache, removing all cached tiles
    Clear,
    /// Remove a single tile from the cache
    Evict {
        /// Tile URL
        url: String,
    },
}

/// Run a cache subcommand.
pub async fn run(action: CacheAction) -> Result<(), CliError> {
    let config = load_config();
    let cache_dir = &config.cache.directory;
    let store = DiskCacheStore::open(cache_dir, config.cache.size).await?;

    match action {
        CacheAction::Stats => {
            println!("Disk cache: {}", cache_dir.display());
            println!("  Tiles: {}", store.entry_count());
            println!(
                "  Size:  {} of {}",
                format_size(store.size_bytes()),
                format_size(store.max_size_bytes())
            );
        }
        CacheAction::Clear => {
            println!("Clearing disk cache at: {}", cache_dir.display());
            let result = store.clear().await?;
            println!(
                "Deleted {} tiles, freed {}",
                result.entries_removed,
                format_size(result.bytes_freed)
            );
        }
        CacheAction::Evict { url } => {
            if store.evict(&url).await? {
                println!("Evicted {} ({})", url, fingerprint(&url));
            } else {
                println!("Not cached: {}", url);
            }
        }
    }

    Ok(())
}
