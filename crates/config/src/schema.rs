//! Config schema types (server, sync loop, watch list, translation, notify, web).

use std::{collections::HashMap, path::PathBuf};

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParrotConfig {
    pub server: ServerConfig,
    pub sync: SyncConfig,
    pub watch: WatchConfig,
    pub translate: TranslateConfig,
    pub notify: NotifyConfig,
    pub web: WebConfig,
    pub store: StoreConfig,
}

/// Chat server connection (filled in by the registration flow).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the chat server, e.g. `https://chat.example.com`.
    pub url: Option<String>,
    /// Access token returned by registration.
    pub token: Option<String>,
    /// WebSocket path appended to the server URL.
    pub ws_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: None,
            token: None,
            ws_path: "/api/v4/websocket".into(),
        }
    }
}

/// Message sync loop (HTTP polling of the translation API).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Endpoint returning a JSON array of `{id, translated}` messages.
    pub endpoint: Option<String>,
    /// Poll interval in seconds.
    pub interval_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            interval_secs: 5,
        }
    }
}

/// Which channels to watch and how to display senders/channels.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Own username, used for personal-mention detection.
    pub username: Option<String>,
    /// Only notify for personal or channel-wide mentions. Off, every new
    /// message notifies.
    pub mention_only: bool,
    /// Channel ids that produce log entries. Empty means watch everything.
    pub channels: Vec<String>,
    /// Raw user id → display name.
    pub user_map: HashMap<String, String>,
    /// Raw channel id → display name.
    pub channel_map: HashMap<String, String>,
}

/// Translation backends.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslateConfig {
    /// Target language code (`vi`, `en`, `ja`, `id`).
    pub target_lang: String,
    /// Primary LLM generateContent endpoint.
    pub api_url: Option<String>,
    /// API key for the primary endpoint.
    pub api_key: Option<String>,
    /// Fallback LibreTranslate-style endpoint.
    pub fallback_url: Option<String>,
    /// Optional API key for the fallback endpoint.
    pub fallback_api_key: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            target_lang: "vi".into(),
            api_url: None,
            api_key: None,
            fallback_url: Some("https://libretranslate.de/translate".into()),
            fallback_api_key: None,
            timeout_secs: 15,
        }
    }
}

/// Notification gating windows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Duplicate window per title, in milliseconds.
    pub dedup_window_ms: u64,
    /// Minimum gap between any two deliveries, in milliseconds.
    pub min_gap_ms: u64,
    /// Suppress window after clearing unread, in milliseconds.
    pub suppress_ms: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            dedup_window_ms: 3_000,
            min_gap_ms: 8_000,
            suppress_ms: 1_500,
        }
    }
}

/// HTTP UI server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Address to bind to. Defaults to "127.0.0.1".
    pub bind: String,
    /// Port to listen on.
    pub port: u16,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 7979,
        }
    }
}

/// Persistent store location and retention.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Data directory override. Defaults to the platform data dir.
    pub data_dir: Option<PathBuf>,
    /// Trim the log to this many most-recent entries on append. None keeps
    /// the log unbounded.
    pub max_entries: Option<usize>,
}
