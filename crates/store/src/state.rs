use std::path::PathBuf;

use {
    serde::{Deserialize, Serialize},
    tokio::sync::RwLock,
    tracing::debug,
};

use crate::error::Result;

/// Persisted sync state: the newest observed message id and the unread
/// counter.
///
/// `last_message_id` only moves forward: it is set to the newest observed
/// id and never cleared while the process runs. `unread` survives restarts
/// through the state file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncState {
    #[serde(default)]
    pub last_message_id: Option<String>,
    #[serde(default)]
    pub unread: u64,
}

/// `state.json`-backed holder for [`SyncState`].
///
/// Mutations write through to disk before returning, so a published change
/// notification always reflects persisted state.
pub struct StateFile {
    inner: RwLock<SyncState>,
    path: PathBuf,
}

impl StateFile {
    /// Load state from `path`, or start fresh when the file is missing or
    /// unreadable.
    pub async fn load(path: PathBuf) -> Result<Self> {
        let state = if path.exists() {
            let raw = tokio::fs::read_to_string(&path).await?;
            serde_json::from_str(&raw).unwrap_or_default()
        } else {
            SyncState::default()
        };
        debug!(path = %path.display(), unread = state.unread, "loaded sync state");
        Ok(Self {
            inner: RwLock::new(state),
            path,
        })
    }

    pub async fn last_message_id(&self) -> Option<String> {
        self.inner.read().await.last_message_id.clone()
    }

    pub async fn unread(&self) -> u64 {
        self.inner.read().await.unread
    }

    /// Record `id` as the newest observed message id.
    ///
    /// Returns `false` without touching disk when `id` matches the recorded
    /// one. The id is never cleared here; only a process restart resets the
    /// in-memory copy (and the persisted one survives that).
    pub async fn advance_last_id(&self, id: &str) -> Result<bool> {
        let mut state = self.inner.write().await;
        if state.last_message_id.as_deref() == Some(id) {
            return Ok(false);
        }
        state.last_message_id = Some(id.to_owned());
        self.save(&state).await?;
        Ok(true)
    }

    /// Increment the unread counter and persist it. Returns the new value.
    pub async fn increment_unread(&self) -> Result<u64> {
        let mut state = self.inner.write().await;
        state.unread += 1;
        self.save(&state).await?;
        Ok(state.unread)
    }

    /// Reset the unread counter to zero and persist it.
    pub async fn clear_unread(&self) -> Result<()> {
        let mut state = self.inner.write().await;
        state.unread = 0;
        self.save(&state).await
    }

    async fn save(&self, state: &SyncState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let raw = serde_json::to_string_pretty(state)?;
        tokio::fs::write(&self.path, raw).await?;
        Ok(())
    }
}
