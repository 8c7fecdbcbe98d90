//! Turns accepted `new_message` events into log entries, unread bumps, and
//! notifications.

use std::{
    collections::HashSet,
    sync::Arc,
    time::{Duration, Instant},
};

use {
    tokio::sync::mpsc,
    tracing::{debug, info, warn},
};

use {
    parrot_config::schema::WatchConfig,
    parrot_notify::{Notification, Notifier},
    parrot_store::{LogEntry, Store},
    parrot_translate::TranslationChain,
};

use crate::{
    connection::SocketEvent,
    error::Result,
    protocol::NewMessage,
    seen::{SeenRing, message_key},
};

/// Messages older than the process baseline minus this buffer are treated
/// as replayed history.
const FOCUS_BUFFER_MS: u64 = 2_000;

/// Grace period after (re)connect during which replayed history never
/// notifies.
const RECONNECT_WARMUP: Duration = Duration::from_secs(2);

pub struct MessageHandler {
    store: Arc<Store>,
    chain: Arc<TranslationChain>,
    notifier: Arc<dyn Notifier>,
    watch: WatchConfig,
    watched: HashSet<String>,
    seen: SeenRing,
    started_at_ms: u64,
    connected_at: Option<Instant>,
}

impl MessageHandler {
    pub fn new(
        store: Arc<Store>,
        chain: Arc<TranslationChain>,
        notifier: Arc<dyn Notifier>,
        watch: WatchConfig,
    ) -> Self {
        let watched = watch.channels.iter().cloned().collect();
        Self {
            store,
            chain,
            notifier,
            watch,
            watched,
            seen: SeenRing::default(),
            started_at_ms: parrot_common::time::now_ms(),
            connected_at: None,
        }
    }

    /// Consume socket events until the channel closes.
    pub async fn run(mut self, mut rx: mpsc::UnboundedReceiver<SocketEvent>) {
        while let Some(event) = rx.recv().await {
            match event {
                SocketEvent::Connected => {
                    info!("chat server connected");
                    self.connected_at = Some(Instant::now());
                },
                SocketEvent::Disconnected => {
                    info!("chat server disconnected");
                },
                SocketEvent::Error(e) => {
                    warn!(error = %e, "socket error");
                },
                SocketEvent::Message(msg) => {
                    if let Err(e) = self.process(msg).await {
                        warn!(error = %e, "failed to process message");
                    }
                },
            }
        }
    }

    /// Handle one `new_message` event: filter, dedupe, translate, log, bump
    /// unread, and decide whether to notify.
    pub async fn process(&mut self, msg: NewMessage) -> Result<()> {
        let raw_channel = msg.channel.clone().unwrap_or_default();
        if !self.watched.is_empty() && !self.watched.contains(&raw_channel) {
            debug!(channel = %raw_channel, "channel not watched, skipping");
            return Ok(());
        }

        if !self.seen.insert(message_key(&msg)) {
            debug!("duplicate message, skipping");
            return Ok(());
        }

        let sender = self
            .watch
            .user_map
            .get(&msg.user)
            .cloned()
            .unwrap_or_else(|| msg.user.clone());
        let channel_name = self
            .watch
            .channel_map
            .get(&raw_channel)
            .cloned()
            .unwrap_or(raw_channel);

        let text = msg.text.trim().to_owned();
        let translated = self.chain.translate(&text).await;

        self.store
            .append_entry(LogEntry::new(
                sender.clone(),
                channel_name.clone(),
                text.clone(),
                translated,
            ))
            .await?;
        let unread = self.store.bump_unread().await?;
        debug!(badge = %unread.to_string(), "badge updated");

        if let Some(title) = self.notification_title(&msg, &sender, &channel_name) {
            if let Err(e) = self.notifier.send(&Notification::new(title, text)).await {
                warn!(error = %e, "notification delivery failed");
            }
        }
        Ok(())
    }

    /// Title for the notification, or `None` when this message must stay
    /// quiet (replayed history, or non-mention in mention-only mode).
    fn notification_title(
        &self,
        msg: &NewMessage,
        sender: &str,
        channel_name: &str,
    ) -> Option<String> {
        let just_connected = self
            .connected_at
            .is_some_and(|at| at.elapsed() < RECONNECT_WARMUP);
        // Undated messages inside the warmup window are assumed replayed.
        if msg.create_at.is_none() && just_connected {
            return None;
        }

        let post_ms = msg.create_at.unwrap_or_else(parrot_common::time::now_ms);
        let baseline = self.started_at_ms.saturating_sub(FOCUS_BUFFER_MS);
        if post_ms < baseline {
            return None;
        }

        let lower = msg.text.to_lowercase();
        let is_personal = self
            .watch
            .username
            .as_ref()
            .is_some_and(|me| lower.contains(&format!("@{}", me.to_lowercase())));
        let is_channel_wide = ["@channel", "@here", "@all"]
            .iter()
            .any(|k| lower.contains(k));

        if is_personal {
            return Some(format!("Mention from {sender} in #{channel_name}"));
        }
        if is_channel_wide {
            return Some(format!("Channel mention in #{channel_name}"));
        }
        if self.watch.mention_only {
            return None;
        }
        Some(format!("New message from {sender} in #{channel_name}"))
    }
}
