use serde::{Deserialize, Serialize};

/// One recorded chat/translation event.
///
/// Immutable once created; appended to the log in arrival order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub time: String,
    pub user: String,
    pub channel: String,
    pub original: String,
    pub translated: String,
}

impl LogEntry {
    /// Build an entry stamped with the current local time.
    pub fn new(
        user: impl Into<String>,
        channel: impl Into<String>,
        original: impl Into<String>,
        translated: impl Into<String>,
    ) -> Self {
        Self {
            time: parrot_common::time::entry_timestamp(),
            user: user.into(),
            channel: channel.into(),
            original: original.into(),
            translated: translated.into(),
        }
    }
}
