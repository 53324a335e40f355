//! Human-readable sizes ("250MB") and durations ("3d").

use std::time::Duration;

use thiserror::Error;

/// Error parsing a size string.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid size '{input}' - expected format like '2GB', '250MB', or '1024KB'")]
pub struct SizeParseError {
    input: String,
}

/// Error parsing a duration string.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid duration '{input}' - expected format like '3d', '12h', '30m' or '45s'")]
pub struct DurationParseError {
    input: String,
}

const KB: u64 = 1024;
const MB: u64 = 1024 * KB;
const GB: u64 = 1024 * MB;

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;

/// Parse a human-readable size string into bytes.
///
/// Supports bare numbers (bytes) and the case-insensitive suffixes
/// `K`/`KB`, `M`/`MB` and `G`/`GB` (powers of 1024). Whitespace between
/// number and suffix is allowed.
///
/// # Examples
///
/// ```
/// use tilestash::config::parse_size;
///
/// assert_eq!(parse_size("1024").unwrap(), 1024);
/// assert_eq!(parse_size("250MB").unwrap(), 250 * 1024 * 1024);
/// assert_eq!(parse_size("2 gb").unwrap(), 2 * 1024 * 1024 * 1024);
/// ```
pub fn parse_size(s: &str) -> Result<u64, SizeParseError> {
    let err = || SizeParseError {
        input: s.to_string(),
    };
    let (number, unit) = split_unit(s).ok_or_else(err)?;

    let multiplier = match unit.to_ascii_uppercase().as_str() {
        "" | "B" => 1,
        "K" | "KB" => KB,
        "M" | "MB" => MB,
        "G" | "GB" => GB,
        _ => return Err(err()),
    };

    number.checked_mul(multiplier).ok_or_else(err)
}

/// Format a byte count as a human-readable string.
///
/// Exact multiples use the largest unit; anything else is printed in bytes
/// so that `parse_size(format_size(n)) == n`.
pub fn format_size(bytes: u64) -> String {
    if bytes >= GB && bytes % GB == 0 {
        format!("{}GB", bytes / GB)
    } else if bytes >= MB && bytes % MB == 0 {
        format!("{}MB", bytes / MB)
    } else if bytes >= KB && bytes % KB == 0 {
        format!("{}KB", bytes / KB)
    } else {
        format!("{}", bytes)
    }
}

/// Format a byte count with one decimal for display, e.g. `12.3 MB`.
pub fn format_size_approx(bytes: u64) -> String {
    let b = bytes as f64;
    if bytes >= GB {
        format!("{:.1} GB", b / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", b / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", b / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Parse a duration such as `3d`, `12h`, `30m`, `45s`.
///
/// A bare number is taken as seconds.
pub fn parse_duration(s: &str) -> Result<Duration, DurationParseError> {
    let err = || DurationParseError {
        input: s.to_string(),
    };
    let (number, unit) = split_unit(s).ok_or_else(err)?;

    let multiplier = match unit.to_ascii_lowercase().as_str() {
        "" | "s" => 1,
        "m" => MINUTE,
        "h" => HOUR,
        "d" => DAY,
        _ => return Err(err()),
    };

    number
        .checked_mul(multiplier)
        .map(Duration::from_secs)
        .ok_or_else(err)
}

/// Format a duration using the largest unit that divides it evenly.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= DAY && secs % DAY == 0 {
        format!("{}d", secs / DAY)
    } else if secs >= HOUR && secs % HOUR == 0 {
        format!("{}h", secs / HOUR)
    } else if secs >= MINUTE && secs % MINUTE == 0 {
        format!("{}m", secs / MINUTE)
    } else {
        format!("{}s", secs)
    }
}

/// Splits `"250 MB"` into `(250, "MB")`.
fn split_unit(s: &str) -> Option<(u64, &str)> {
    let s = s.trim();
    let digits_end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    if digits_end == 0 {
        return None;
    }
    let number = s[..digits_end].parse().ok()?;
    Some((number, s[digits_end..].trim()))
}
