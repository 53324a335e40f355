//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;

use tilestash::cache::CacheError;
use tilestash::config::ConfigFileError;
use tilestash::coord::AddressError;
use tilestash::fetch::{FetchError, TransportError};
use tilestash::prefetch::PrefetchError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Region or zoom range rejected by the address generator
    Address(AddressError),
    /// HTTP client could not be created
    Transport(TransportError),
    /// Failed to fetch a tile
    Fetch(FetchError),
    /// Prefetch batch could not run
    Prefetch(PrefetchError),
    /// Cache store operation failed
    Cache(CacheError),
    /// Failed to write output file
    FileWrite { path: String, error: std::io::Error },
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Fetch(FetchError::NotCached { .. }) => {
                eprintln!();
                eprintln!("The network is unreachable and this tile is not cached.");
                eprintln!("Run 'tilestash prefetch' for the region while online first.");
            }
            CliError::Address(AddressError::InvalidRange { .. }) => {
                eprintln!();
                eprintln!("Zoom levels must satisfy 0 <= min-zoom <= max-zoom <= 23.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Address(e) => write!(f, "Invalid region: {}", e),
            CliError::Transport(e) => write!(f, "Failed to create HTTP client: {}", e),
            CliError::Fetch(e) => write!(f, "Failed to fetch tile: {}", e),
            CliError::Prefetch(e) => write!(f, "Prefetch failed: {}", e),
            CliError::Cache(e) => write!(f, "Cache error: {}", e),
            CliError::FileWrite { path, error } => {
                write!(f, "Failed to write file '{}': {}", path, error)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Address(e) => Some(e),
            CliError::Transport(e) => Some(e),
            CliError::Fetch(e) => Some(e),
            CliError::Prefetch(e) => Some(e),
            CliError::Cache(e) => Some(e),
            CliError::FileWrite { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<AddressError> for CliError {
    fn from(e: AddressError) -> Self {
        CliError::Address(e)
    }
}

impl From<FetchError> for CliError {
    fn from(e: FetchError) -> Self {
        CliError::Fetch(e)
    }
}

impl From<TransportError> for CliError {
    fn from(e: TransportError) -> Self {
        CliError::Transport(e)
    }
}

impl From<PrefetchError> for CliError {
    fn from(e: PrefetchError) -> Self {
        CliError::Prefetch(e)
    }
}

impl From<CacheError> for CliError {
    fn from(e: CacheError) -> Self {
        CliError::Cache(e)
    }
}
