//! Askama templates for the popup and full-log views.

use askama::Template;

use parrot_store::LogEntry;

/// The popup never shows more than this many entries, no matter how long
/// the underlying log is.
pub const RECENT_LIMIT: usize = 20;

#[derive(Template)]
#[template(path = "popup.html", escape = "html")]
pub struct PopupTemplate {
    pub unread: u64,
    pub entries: Vec<LogEntry>,
}

#[derive(Template)]
#[template(path = "log.html", escape = "html")]
pub struct LogPageTemplate {
    pub entries: Vec<LogEntry>,
}

/// Order entries for the popup: newest first, capped at [`RECENT_LIMIT`].
/// Input is append order (oldest first).
#[must_use]
pub fn popup_entries(mut entries: Vec<LogEntry>) -> Vec<LogEntry> {
    entries.reverse();
    entries.truncate(RECENT_LIMIT);
    entries
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn entry(i: usize) -> LogEntry {
        LogEntry::new(format!("user{i}"), "general", format!("msg {i}"), "")
    }

    fn hostile_entry() -> LogEntry {
        LogEntry::new(
            "<script>alert('u')</script>",
            "chan\"quote",
            "a < b & c > d",
            "it's <b>bold</b>",
        )
    }

    #[test]
    fn popup_caps_at_twenty_newest_first() {
        let entries: Vec<LogEntry> = (0..50).map(entry).collect();
        let view = popup_entries(entries);
        assert_eq!(view.len(), RECENT_LIMIT);
        assert_eq!(view[0].user, "user49");
        assert_eq!(view[19].user, "user30");
    }

    #[test]
    fn popup_escapes_user_fields() {
        let html = PopupTemplate {
            unread: 3,
            entries: vec![hostile_entry()],
        }
        .render()
        .unwrap();

        assert!(!html.contains("<script>alert"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("a &lt; b &amp; c &gt; d"));
        assert!(!html.contains("<b>bold</b>"));
    }

    #[test]
    fn popup_badge_reflects_unread() {
        let with_unread = PopupTemplate {
            unread: 7,
            entries: vec![],
        }
        .render()
        .unwrap();
        assert!(with_unread.contains("Unread: 7"));

        let cleared = PopupTemplate {
            unread: 0,
            entries: vec![],
        }
        .render()
        .unwrap();
        assert!(!cleared.contains("Unread:"));
    }

    #[test]
    fn log_page_escapes_and_keeps_order() {
        let html = LogPageTemplate {
            entries: vec![entry(0), hostile_entry(), entry(2)],
        }
        .render()
        .unwrap();

        assert!(!html.contains("<script>alert"));
        assert!(html.contains("&lt;script&gt;"));
        let first = html.find("user0").unwrap();
        let last = html.find("user2").unwrap();
        assert!(first < last);
    }
}
