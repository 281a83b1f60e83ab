//! Shared utility functions.

use chrono::{DateTime, Utc};

use crate::constants::WINSTON_PER_AR;

/// Convert a winston amount to an AR decimal string with 12 places.
///
/// # Examples
///
/// ```
/// use arscan::utils::winston_to_ar;
///
/// assert_eq!(winston_to_ar(0), "0.000000000000");
/// assert_eq!(winston_to_ar(1_500_000_000_000), "1.500000000000");
/// assert_eq!(winston_to_ar(42), "0.000000000042");
/// ```
pub fn winston_to_ar(winston: u128) -> String {
    format!("{}.{:012}", winston / WINSTON_PER_AR, winston % WINSTON_PER_AR)
}

/// Format a unix timestamp in seconds as UTC.
pub fn format_timestamp(secs: i64) -> String {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .map_or_else(|| format!("@{secs}"), |t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
}

/// Format a unix timestamp in milliseconds as UTC.
pub fn format_millis(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map_or_else(|| format!("@{millis}ms"), |t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
}

/// Format bytes in human-readable form.
///
/// # Examples
///
/// ```
/// use arscan::utils::format_bytes;
///
/// assert_eq!(format_bytes(0), "0 bytes");
/// assert_eq!(format_bytes(1024), "1.0 KB");
/// assert_eq!(format_bytes(1536), "1.5 KB");
/// assert_eq!(format_bytes(1048576), "1.0 MB");
/// ```
#[allow(clippy::cast_precision_loss)]
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;
    const GB: u64 = 1024 * 1024 * 1024;
    const TB: u64 = 1024 * 1024 * 1024 * 1024;

    if bytes == 0 {
        "0 bytes".to_string()
    } else if bytes >= TB {
        format!("{:.2} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} bytes")
    }
}

/// Format a duration in human-readable form.
///
/// # Examples
///
/// ```
/// use chrono::Duration;
/// use arscan::utils::format_duration;
///
/// assert_eq!(format_duration(Duration::seconds(30)), "30s");
/// assert_eq!(format_duration(Duration::seconds(90)), "1m 30s");
/// assert_eq!(format_duration(Duration::seconds(3660)), "1h 1m");
/// assert_eq!(format_duration(Duration::seconds(90000)), "1d 1h");
/// ```
pub fn format_duration(duration: chrono::Duration) -> String {
    let secs = duration.num_seconds();
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs < 86400 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
    }
}
