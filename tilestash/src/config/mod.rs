//! Configuration: fetch policy, fetcher settings and the INI config file.

mod file;
mod policy;
mod size;

pub use file::{
    config_directory, config_file_path, CacheSettings, ConfigFile, ConfigFileError,
    DownloadSettings, LoggingSettings, TilesSettings, DEFAULT_MAX_ZOOM, DEFAULT_MIN_ZOOM,
    DEFAULT_PARALLEL,
};
pub use policy::{
    default_cache_directory, default_user_agent, FetchConfig, FetchPolicy,
    DEFAULT_CACHE_CAPACITY_BYTES, DEFAULT_MAX_AGE, DEFAULT_MAX_STALE, DEFAULT_REQUEST_TIMEOUT,
};
pub use size::{
    format_duration, format_size, format_size_approx, parse_duration, parse_size,
    DurationParseError, SizeParseError,
};
