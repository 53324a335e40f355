//! Configuration file handling for ~/.tilestash/config.ini.
//!
//! Loads and saves user configuration with sensible defaults. Missing keys
//! keep their default values; present keys are validated.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use super::policy::{
    default_cache_directory, default_user_agent, FetchConfig, FetchPolicy,
    DEFAULT_CACHE_CAPACITY_BYTES, DEFAULT_MAX_AGE, DEFAULT_MAX_STALE, DEFAULT_REQUEST_TIMEOUT,
};
use super::size::{format_duration, format_size, parse_duration, parse_size};
use crate::coord::ZoomRange;
use crate::tile::DEFAULT_BASE_URL;

/// Default lowest zoom level for region commands.
pub const DEFAULT_MIN_ZOOM: u8 = 1;

/// Default highest zoom level for region commands.
pub const DEFAULT_MAX_ZOOM: u8 = 18;

/// Default number of concurrent downloads during prefetch.
pub const DEFAULT_PARALLEL: usize = 8;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Failed to write config file
    #[error("Failed to write config file: {0}")]
    WriteError(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// Failed to create config directory
    #[error("Failed to create config directory: {0}")]
    DirectoryError(std::io::Error),
}

impl ConfigFileError {
    fn invalid(section: &str, key: &str, value: &str, reason: impl Into<String>) -> Self {
        ConfigFileError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// `[tiles]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TilesSettings {
    pub base_url: String,
    pub min_zoom: u8,
    pub max_zoom: u8,
}

/// `[cache]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    pub directory: PathBuf,
    pub size: u64,
    pub max_age: Duration,
    pub max_stale: Duration,
}

/// `[download]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSettings {
    pub timeout: Duration,
    pub parallel: usize,
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    pub file: PathBuf,
}

/// Parsed contents of `config.ini`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    pub tiles: TilesSettings,
    pub cache: CacheSettings,
    pub download: DownloadSettings,
    pub logging: LoggingSettings,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            tiles: TilesSettings {
                base_url: DEFAULT_BASE_URL.to_string(),
                min_zoom: DEFAULT_MIN_ZOOM,
                max_zoom: DEFAULT_MAX_ZOOM,
            },
            cache: CacheSettings {
                directory: default_cache_directory(),
                size: DEFAULT_CACHE_CAPACITY_BYTES,
                max_age: DEFAULT_MAX_AGE,
                max_stale: DEFAULT_MAX_STALE,
            },
            download: DownloadSettings {
                timeout: DEFAULT_REQUEST_TIMEOUT,
                parallel: DEFAULT_PARALLEL,
            },
            logging: LoggingSettings {
                file: config_directory().join("tilestash.log"),
            },
        }
    }
}

impl ConfigFile {
    /// Load configuration from the default path (~/.tilestash/config.ini).
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        parse_ini(&ini)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigFileError::DirectoryError)?;
        }

        std::fs::write(path, self.to_config_string())
            .map_err(|e| ConfigFileError::WriteError(e.to_string()))
    }

    /// Create the default config file if it doesn't exist.
    ///
    /// Returns the path to the config file.
    pub fn ensure_exists() -> Result<PathBuf, ConfigFileError> {
        let path = config_file_path();
        if !path.exists() {
            Self::default().save_to(&path)?;
        }
        Ok(path)
    }

    /// Zoom range configured in `[tiles]`.
    pub fn zoom_range(&self) -> ZoomRange {
        ZoomRange {
            min: self.tiles.min_zoom,
            max: self.tiles.max_zoom,
        }
    }

    /// Settings for constructing a fetcher.
    pub fn to_fetch_config(&self) -> FetchConfig {
        FetchConfig {
            policy: FetchPolicy {
                max_age: self.cache.max_age,
                max_stale: self.cache.max_stale,
                cache_capacity_bytes: self.cache.size,
            },
            cache_directory: self.cache.directory.clone(),
            request_timeout: self.download.timeout,
            user_agent: default_user_agent(),
        }
    }

    fn to_config_string(&self) -> String {
        format!(
            r#"[tiles]
; Tile server base URL; tiles are requested as {{base_url}}/{{zoom}}/{{col}}/{{row}}.png
base_url = {}
; Default zoom range for region commands (0-23)
min_zoom = {}
max_zoom = {}

[cache]
; Directory holding cached tiles
directory = {}
; Maximum cache size (e.g. 250MB, 2GB)
size = {}
; Serve cached tiles without asking the server while younger than max_age
max_age = {}
; Serve cached tiles when the server is unreachable while younger than max_stale
max_stale = {}

[download]
; Per-request timeout (e.g. 30s, 2m)
timeout = {}
; Concurrent downloads during prefetch
parallel = {}

[logging]
file = {}
"#,
            self.tiles.base_url,
            self.tiles.min_zoom,
            self.tiles.max_zoom,
            self.cache.directory.display(),
            format_size(self.cache.size),
            format_duration(self.cache.max_age),
            format_duration(self.cache.max_stale),
            format_duration(self.download.timeout),
            self.download.parallel,
            self.logging.file.display(),
        )
    }
}

/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    if let Some(section) = ini.section(Some("tiles")) {
        if let Some(v) = section.get("base_url") {
            let v = v.trim();
            if reqwest::Url::parse(v).is_err() {
                return Err(ConfigFileError::invalid(
                    "tiles",
                    "base_url",
                    v,
                    "expected an absolute URL like http://a.tile.openstreetmap.org",
                ));
            }
            config.tiles.base_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = section.get("min_zoom") {
            config.tiles.min_zoom = parse_zoom("min_zoom", v)?;
        }
        if let Some(v) = section.get("max_zoom") {
            config.tiles.max_zoom = parse_zoom("max_zoom", v)?;
        }
        let range = config.zoom_range();
        if let Err(e) = range.validate() {
            return Err(ConfigFileError::invalid(
                "tiles",
                "min_zoom",
                &range.min.to_string(),
                e.to_string(),
            ));
        }
    }

    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = section.get("directory") {
            let v = v.trim();
            if !v.is_empty() {
                config.cache.directory = expand_tilde(v);
            }
        }
        if let Some(v) = section.get("size") {
            config.cache.size = parse_size(v)
                .map_err(|e| ConfigFileError::invalid("cache", "size", v, e.to_string()))?;
        }
        if let Some(v) = section.get("max_age") {
            config.cache.max_age = parse_duration(v)
                .map_err(|e| ConfigFileError::invalid("cache", "max_age", v, e.to_string()))?;
        }
        if let Some(v) = section.get("max_stale") {
            config.cache.max_stale = parse_duration(v)
                .map_err(|e| ConfigFileError::invalid("cache", "max_stale", v, e.to_string()))?;
        }
        if config.cache.max_stale < config.cache.max_age {
            return Err(ConfigFileError::invalid(
                "cache",
                "max_stale",
                &format_duration(config.cache.max_stale),
                "must not be shorter than max_age",
            ));
        }
    }

    if let Some(section) = ini.section(Some("download")) {
        if let Some(v) = section.get("timeout") {
            config.download.timeout = parse_duration(v)
                .map_err(|e| ConfigFileError::invalid("download", "timeout", v, e.to_string()))?;
        }
        if let Some(v) = section.get("parallel") {
            config.download.parallel = match v.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigFileError::invalid(
                        "download",
                        "parallel",
                        v,
                        "expected a positive integer",
                    ))
                }
            };
        }
    }

    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = expand_tilde(v);
            }
        }
    }

    Ok(config)
}

fn parse_zoom(key: &str, value: &str) -> Result<u8, ConfigFileError> {
    value
        .trim()
        .parse::<u8>()
        .map_err(|_| ConfigFileError::invalid("tiles", key, value, "expected a zoom level 0-23"))
}

/// Expand a leading `~` to the home directory.
fn expand_tilde(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}

/// Get the path to the config directory (~/.tilestash).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tilestash")
}

/// Get the path to the config file (~/.tilestash/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}
