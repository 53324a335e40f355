//! CLI runner for common setup and operations.
//!
//! Encapsulates logging initialization, reachability selection and fetcher
//! creation to reduce duplication across command handlers.

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use tilestash::config::ConfigFile;
use tilestash::fetch::{
    probe_target, CachingFetcher, ConnectivityMonitor, ManualReachability, Reachability,
    DEFAULT_PROBE_INTERVAL, DEFAULT_PROBE_TIMEOUT,
};
use tilestash::logging::{default_log_file, init_logging, LoggingGuard};

use crate::error::CliError;

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    #[allow(dead_code)]
    logging_guard: LoggingGuard,
    /// Loaded configuration file
    config: ConfigFile,
    /// Stops background tasks (connectivity probing) when the command ends
    shutdown: CancellationToken,
}

impl CliRunner {
    /// Create a new CLI runner, loading config and initializing logging.
    ///
    /// # Arguments
    ///
    /// * `verbose` - Echo log output to stderr at debug level
    pub fn new(verbose: bool) -> Result<Self, CliError> {
        let config = ConfigFile::load()?;

        let log_path = &config.logging.file;
        let log_dir = log_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let log_file = log_path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| default_log_file().to_string());

        let logging_guard = init_logging(log_dir, &log_file, verbose, verbose)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            logging_guard,
            config,
            shutdown: CancellationToken::new(),
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("TileStash v{}", tilestash::VERSION);
        info!("TileStash CLI: {} command", command);
    }

    /// Choose the reachability signal for this run.
    ///
    /// `--offline` pins the fetcher to cache-only. Otherwise the tile
    /// server is probed over TCP in the background.
    pub async fn reachability(&self, offline: bool, base_url: &str) -> Arc<dyn Reachability> {
        if offline {
            info!("Offline mode forced, serving from cache only");
            return Arc::new(ManualReachability::offline());
        }

        match probe_target(base_url) {
            Some(target) => {
                let monitor = ConnectivityMonitor::start(
                    target,
                    DEFAULT_PROBE_INTERVAL,
                    DEFAULT_PROBE_TIMEOUT,
                    self.shutdown.child_token(),
                )
                .await;
                if !monitor.is_reachable() {
                    println!("Tile server {} unreachable, using cached tiles", monitor.target());
                }
                monitor as Arc<dyn Reachability>
            }
            None => Arc::new(ManualReachability::online()),
        }
    }

    /// Create a caching fetcher from the configuration.
    pub async fn create_fetcher(
        &self,
        reachability: Arc<dyn Reachability>,
    ) -> Result<CachingFetcher, CliError> {
        let fetch_config = self.config.to_fetch_config();
        CachingFetcher::open(&fetch_config, reachability)
            .await
            .map_err(CliError::Transport)
            .inspect(|_| info!("Fetcher created successfully"))
    }
}

impl Drop for CliRunner {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
