//! Notification model, delivery trait, and gating.
//!
//! Delivery is fire-and-forget everywhere: a failed send is logged and
//! dropped, never retried.

pub mod error;
pub mod gate;
pub mod push;

use std::{sync::Arc, time::Instant};

use {
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
    tokio::sync::Mutex,
    tracing::{debug, info, warn},
};

use parrot_config::schema::NotifyConfig;

pub use crate::{
    error::{Error, Result},
    gate::NotifyGate,
    push::{PushService, PushSubscription},
};

/// One notification to the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    /// URL to open when clicked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Notification {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            url: None,
        }
    }

    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// A notification delivery backend.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<()>;
}

/// Delivery backend that only logs. Used headless and in tests.
#[derive(Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn send(&self, notification: &Notification) -> Result<()> {
        info!(title = %notification.title, body = %notification.body, "notification");
        Ok(())
    }
}

/// Wraps a delivery backend with the [`NotifyGate`] windows.
pub struct GatedNotifier {
    inner: Arc<dyn Notifier>,
    gate: Mutex<NotifyGate>,
}

impl GatedNotifier {
    pub fn new(inner: Arc<dyn Notifier>, cfg: &NotifyConfig) -> Self {
        Self {
            inner,
            gate: Mutex::new(NotifyGate::new(cfg)),
        }
    }

    /// Arm the suppress window (the clear-unread action routes here).
    pub async fn suppress(&self) {
        self.gate.lock().await.suppress(Instant::now());
    }
}

#[async_trait]
impl Notifier for GatedNotifier {
    async fn send(&self, notification: &Notification) -> Result<()> {
        let allowed = self
            .gate
            .lock()
            .await
            .allow(&notification.title, Instant::now());
        if !allowed {
            debug!(title = %notification.title, "notification gated");
            return Ok(());
        }
        if let Err(e) = self.inner.send(notification).await {
            // Fire-and-forget: log and swallow.
            warn!(error = %e, "notification delivery failed");
        }
        Ok(())
    }
}
