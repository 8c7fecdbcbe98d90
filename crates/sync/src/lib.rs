//! The message sync loop: polls the translation API on a fixed interval and
//! raises a notification when the newest message changes.
//!
//! Cycles run sequentially inside one task, so a slow response delays the next
//! cycle instead of overlapping it. A failed cycle is logged and skipped;
//! the next tick retries with no backoff.

use std::{sync::Arc, time::Duration};

use {
    serde::{Deserialize, Deserializer},
    thiserror::Error,
    tokio::time::MissedTickBehavior,
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use {
    parrot_notify::{Notification, Notifier},
    parrot_store::{LogEntry, Store},
};

/// Body text used when a message arrives without translated content.
const PLACEHOLDER_BODY: &str = "(no content)";

/// Notification title for messages discovered by polling.
const SYNC_TITLE: &str = "New message";

#[derive(Error, Debug)]
pub enum Error {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Store(#[from] parrot_store::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// One element of the polled JSON array. Only `id` and `translated` are
/// guaranteed; the other fields are logged when the API includes them.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiMessage {
    #[serde(default, deserialize_with = "de_opt_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub translated: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub original: Option<String>,
}

/// Accept string or numeric ids; both occur in the wild.
fn de_opt_id<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// The newest unseen message, if any: only the last array element is
/// examined, and the comparison is pure identity against the recorded id.
/// Earlier unseen ids are deliberately not surfaced.
fn detect_new<'a>(messages: &'a [ApiMessage], last_id: Option<&str>) -> Option<&'a ApiMessage> {
    let newest = messages.last()?;
    let id = newest.id.as_deref()?;
    if Some(id) == last_id {
        return None;
    }
    Some(newest)
}

pub struct SyncLoop {
    client: reqwest::Client,
    endpoint: String,
    interval: Duration,
    store: Arc<Store>,
    notifier: Arc<dyn Notifier>,
}

impl SyncLoop {
    pub fn new(
        endpoint: String,
        interval: Duration,
        store: Arc<Store>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            interval,
            store,
            notifier,
        }
    }

    /// Run until cancelled. Polls once immediately, then on every tick.
    pub async fn run(self, cancel: CancellationToken) {
        info!(endpoint = %self.endpoint, interval_secs = self.interval.as_secs(), "sync loop started");
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.cycle().await {
                        warn!(error = %e, "sync cycle failed");
                    }
                },
                () = cancel.cancelled() => {
                    info!("sync loop stopped");
                    return;
                },
            }
        }
    }

    /// One poll cycle. Any failure skips the cycle; state stays untouched.
    pub async fn cycle(&self) -> Result<()> {
        let messages = self.fetch().await?;
        if messages.is_empty() {
            return Ok(());
        }

        let last_id = self.store.last_message_id().await;
        let Some(newest) = detect_new(&messages, last_id.as_deref()) else {
            return Ok(());
        };
        let Some(id) = newest.id.as_deref() else {
            return Ok(());
        };

        self.store.advance_last_id(id).await?;

        let body = newest
            .translated
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(PLACEHOLDER_BODY);
        debug!(id, "new message from sync poll");

        self.store
            .append_entry(LogEntry::new(
                newest.user.clone().unwrap_or_default(),
                newest.channel.clone().unwrap_or_default(),
                newest.original.clone().unwrap_or_default(),
                body,
            ))
            .await?;

        if let Err(e) = self
            .notifier
            .send(&Notification::new(SYNC_TITLE, body))
            .await
        {
            warn!(error = %e, "notification delivery failed");
        }
        Ok(())
    }

    async fn fetch(&self) -> Result<Vec<ApiMessage>> {
        let messages = self
            .client
            .get(&self.endpoint)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<ApiMessage>>()
            .await?;
        Ok(messages)
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;

    struct Counting(AtomicUsize);

    #[async_trait]
    impl Notifier for Counting {
        async fn send(
            &self,
            _notification: &Notification,
        ) -> parrot_notify::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    async fn fixture(server: &mockito::Server) -> (SyncLoop, Arc<Store>, Arc<Counting>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::open(dir.path().to_path_buf(), None).await.unwrap());
        let notifier = Arc::new(Counting(AtomicUsize::new(0)));
        let sync = SyncLoop::new(
            format!("{}/translate", server.url()),
            Duration::from_secs(5),
            store.clone(),
            notifier.clone(),
        );
        (sync, store, notifier, dir)
    }

    #[test]
    fn detect_new_examines_only_last_element() {
        let msgs: Vec<ApiMessage> = serde_json::from_str(
            r#"[{"id": "a", "translated": "1"}, {"id": "b", "translated": "2"}]"#,
        )
        .unwrap();

        // unseen earlier id "a" is skipped when the last id is already known
        assert!(detect_new(&msgs, Some("b")).is_none());
        let hit = detect_new(&msgs, Some("a")).unwrap();
        assert_eq!(hit.id.as_deref(), Some("b"));
        assert!(detect_new(&msgs, None).is_some());
    }

    #[test]
    fn numeric_ids_are_accepted() {
        let msgs: Vec<ApiMessage> =
            serde_json::from_str(r#"[{"id": 42, "translated": "x"}]"#).unwrap();
        assert_eq!(msgs[0].id.as_deref(), Some("42"));
    }

    #[tokio::test]
    async fn new_id_notifies_once_and_advances() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/translate")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"id": "m1", "translated": "xin chào"}]"#)
            .create_async()
            .await;

        let (sync, store, notifier, _dir) = fixture(&server).await;
        sync.cycle().await.unwrap();

        assert_eq!(notifier.0.load(Ordering::SeqCst), 1);
        assert_eq!(store.last_message_id().await.as_deref(), Some("m1"));
        assert_eq!(store.entry_count().await.unwrap(), 1);

        // same payload again: no second notification
        sync.cycle().await.unwrap();
        assert_eq!(notifier.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn http_error_leaves_state_unchanged() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/translate")
            .with_status(500)
            .create_async()
            .await;

        let (sync, store, notifier, _dir) = fixture(&server).await;
        assert!(sync.cycle().await.is_err());
        assert_eq!(notifier.0.load(Ordering::SeqCst), 0);
        assert_eq!(store.last_message_id().await, None);
    }

    #[tokio::test]
    async fn non_array_body_leaves_state_unchanged() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/translate")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": "not an array"}"#)
            .create_async()
            .await;

        let (sync, store, notifier, _dir) = fixture(&server).await;
        assert!(sync.cycle().await.is_err());
        assert_eq!(notifier.0.load(Ordering::SeqCst), 0);
        assert_eq!(store.last_message_id().await, None);
    }

    #[tokio::test]
    async fn empty_array_is_a_quiet_cycle() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/translate")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("[]")
            .create_async()
            .await;

        let (sync, store, notifier, _dir) = fixture(&server).await;
        sync.cycle().await.unwrap();
        assert_eq!(notifier.0.load(Ordering::SeqCst), 0);
        assert_eq!(store.last_message_id().await, None);
    }

    #[tokio::test]
    async fn missing_translated_uses_placeholder() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/translate")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"id": "m1"}]"#)
            .create_async()
            .await;

        let (sync, store, _notifier, _dir) = fixture(&server).await;
        sync.cycle().await.unwrap();

        let entries = store.all_entries().await.unwrap();
        assert_eq!(entries[0].translated, PLACEHOLDER_BODY);
    }
}
