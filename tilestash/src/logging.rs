//! Logging infrastructure.
//!
//! Structured logging through `tracing` with two outputs:
//! - A log file written through a non-blocking appender (truncated per run)
//! - Optionally stderr, so command output on stdout stays clean
//!
//! The filter comes from `RUST_LOG`, falling back to `info` (or `debug` when
//! verbose).

use std::fs;
use std::io;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Guard that must be kept alive for the duration of logging.
///
/// Dropping this guard will flush and close the log file writer.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Initialize the global subscriber.
///
/// # Arguments
///
/// * `log_dir` - Directory for the log file, created if missing
/// * `log_file` - Log filename (e.g., "tilestash.log")
/// * `stderr_enabled` - Also write human-readable output to stderr
/// * `verbose` - Default to `debug` instead of `info` when `RUST_LOG` is unset
///
/// # Errors
///
/// Returns an error if the log directory cannot be created, the log file
/// cannot be truncated, or a global subscriber is already installed.
pub fn init_logging(
    log_dir: &Path,
    log_file: &str,
    stderr_enabled: bool,
    verbose: bool,
) -> Result<LoggingGuard, io::Error> {
    fs::create_dir_all(log_dir)?;
    fs::write(log_dir.join(log_file), "")?;

    let file_appender = tracing_appender::rolling::never(log_dir, log_file);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_target(true);

    let stderr_layer = stderr_enabled.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(io::stderr)
            .with_target(false)
            .compact()
    });

    tracing_subscriber::registry()
        .with(env_filter(verbose))
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|e| io::Error::new(io::ErrorKind::AlreadyExists, e.to_string()))?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// Filter from `RUST_LOG`, or the default level.
fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level(verbose)))
}

fn default_level(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}

/// Get default log file name.
pub fn default_log_file() -> &'static str {
    "tilestash.log"
}
