//! The shared log store: a persistent, ordered log of translated messages,
//! the sync state (`last_message_id`, unread counter), and a broadcast
//! publish/subscribe bus that views attach to.
//!
//! Every mutation persists to disk first and publishes its event second, so
//! subscribers always observe state that a re-read would confirm.

pub mod entry;
pub mod error;
pub mod events;
pub mod log;
pub mod state;

use std::path::PathBuf;

use tokio::sync::broadcast;

pub use crate::{
    entry::LogEntry,
    error::{Error, Result},
    events::StoreEvent,
};
use crate::{error::Context as _, events::EventBus, log::LogStore, state::StateFile};

/// Broadcast capacity; laggy view subscribers re-read on `Lagged`.
const EVENT_CAPACITY: usize = 256;

/// Handle owning the log file, the state file, and the event bus.
pub struct Store {
    log: LogStore,
    state: StateFile,
    events: EventBus,
}

impl Store {
    /// Open (or create) the store under `data_dir`.
    pub async fn open(data_dir: PathBuf, max_entries: Option<usize>) -> Result<Self> {
        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("create data dir {}", data_dir.display()))?;
        let log = LogStore::new(data_dir.join("logs.jsonl"), max_entries);
        let state = StateFile::load(data_dir.join("state.json")).await?;
        Ok(Self {
            log,
            state,
            events: EventBus::new(EVENT_CAPACITY),
        })
    }

    /// Subscribe to change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Append one entry and notify subscribers.
    pub async fn append_entry(&self, entry: LogEntry) -> Result<()> {
        self.log.append(&entry).await?;
        self.events.publish(StoreEvent::LogAppended(entry));
        Ok(())
    }

    /// Increment the unread counter, persist it, notify subscribers.
    pub async fn bump_unread(&self) -> Result<u64> {
        let unread = self.state.increment_unread().await?;
        self.events.publish(StoreEvent::UnreadChanged(unread));
        Ok(unread)
    }

    /// Reset the unread counter to zero. The log itself is retained.
    pub async fn clear_unread(&self) -> Result<()> {
        self.state.clear_unread().await?;
        self.events.publish(StoreEvent::UnreadChanged(0));
        Ok(())
    }

    /// Record `id` as the newest observed message id. Returns whether the id
    /// actually changed.
    pub async fn advance_last_id(&self, id: &str) -> Result<bool> {
        self.state.advance_last_id(id).await
    }

    pub async fn last_message_id(&self) -> Option<String> {
        self.state.last_message_id().await
    }

    pub async fn unread(&self) -> u64 {
        self.state.unread().await
    }

    /// The `n` most recent entries in append order.
    pub async fn recent(&self, n: usize) -> Result<Vec<LogEntry>> {
        self.log.tail(n).await
    }

    /// Every entry in append order.
    pub async fn all_entries(&self) -> Result<Vec<LogEntry>> {
        self.log.read_all().await
    }

    pub async fn entry_count(&self) -> Result<usize> {
        self.log.count().await
    }
}
