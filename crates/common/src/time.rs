//! Clock helpers shared by the sync loop, socket listener, and log store.

use chrono::Local;

/// Current wall-clock time in milliseconds since the Unix epoch.
#[must_use]
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Timestamp string stamped onto new log entries (local time).
#[must_use]
pub fn entry_timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
