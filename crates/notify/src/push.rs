//! Web Push delivery backend.
//!
//! Handles VAPID key generation/storage and browser subscription
//! management; notifications go out to every stored subscription, and
//! subscriptions that come back 410 Gone are pruned.

use std::{path::PathBuf, sync::Arc};

use {
    async_trait::async_trait,
    base64::Engine,
    chrono::{DateTime, Utc},
    p256::{
        PublicKey, ecdsa::SigningKey, elliptic_curve::rand_core::OsRng, pkcs8::EncodePrivateKey,
    },
    serde::{Deserialize, Serialize},
    tokio::sync::RwLock,
    tracing::{debug, error, info, warn},
    web_push::{
        ContentEncoding, SubscriptionInfo, VapidSignatureBuilder, WebPushClient,
        WebPushMessageBuilder,
    },
};

use crate::{
    Notification, Notifier,
    error::{Error, Result},
};

/// VAPID keys for push notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VapidKeys {
    /// Base64 URL-safe encoded public key (for the browser).
    pub public_key: String,
    /// PEM-encoded private key (for signing).
    pub private_key_pem: String,
}

/// A push subscription from a browser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushSubscription {
    /// The push endpoint URL.
    pub endpoint: String,
    /// The p256dh key (base64 URL-safe encoded).
    pub p256dh: String,
    /// The auth secret (base64 URL-safe encoded).
    pub auth: String,
    /// When the subscription was created.
    pub created_at: DateTime<Utc>,
}

impl PushSubscription {
    pub fn new(
        endpoint: impl Into<String>,
        p256dh: impl Into<String>,
        auth: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            p256dh: p256dh.into(),
            auth: auth.into(),
            created_at: Utc::now(),
        }
    }
}

/// Stored push data (VAPID keys + subscriptions).
#[derive(Debug, Default, Serialize, Deserialize)]
struct PushStore {
    #[serde(skip_serializing_if = "Option::is_none")]
    vapid: Option<VapidKeys>,
    #[serde(default)]
    subscriptions: Vec<PushSubscription>,
}

/// Push notification service.
pub struct PushService {
    store: RwLock<PushStore>,
    store_path: PathBuf,
    client: Box<dyn WebPushClient + Send + Sync>,
}

impl PushService {
    /// Create a new push service, loading or generating VAPID keys.
    pub async fn new(data_dir: &std::path::Path) -> Result<Arc<Self>> {
        let store_path = data_dir.join("push.json");
        let store = if store_path.exists() {
            let content = tokio::fs::read_to_string(&store_path).await?;
            serde_json::from_str(&content).unwrap_or_default()
        } else {
            PushStore::default()
        };

        let client: Box<dyn WebPushClient + Send + Sync> =
            Box::new(web_push::IsahcWebPushClient::new()?);

        let service = Arc::new(Self {
            store: RwLock::new(store),
            store_path,
            client,
        });

        if service.store.read().await.vapid.is_none() {
            service.generate_vapid_keys().await?;
        }

        Ok(service)
    }

    /// Generate new VAPID keys and save them.
    async fn generate_vapid_keys(&self) -> Result<()> {
        info!("generating new VAPID keys for push notifications");

        let signing_key = SigningKey::random(&mut OsRng);
        let public_key = PublicKey::from(signing_key.verifying_key());

        let public_key_bytes = public_key.to_sec1_bytes();
        let public_key_b64 =
            base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(&public_key_bytes);

        let private_key_pem = signing_key
            .to_pkcs8_pem(p256::pkcs8::LineEnding::LF)
            .map_err(|e| Error::Message(format!("failed to encode private key: {e}")))?;

        let keys = VapidKeys {
            public_key: public_key_b64,
            private_key_pem: private_key_pem.to_string(),
        };

        {
            let mut store = self.store.write().await;
            store.vapid = Some(keys);
        }

        self.save_store().await
    }

    /// Get the VAPID public key for clients.
    pub async fn vapid_public_key(&self) -> Option<String> {
        self.store
            .read()
            .await
            .vapid
            .as_ref()
            .map(|v| v.public_key.clone())
    }

    /// Add a new push subscription, replacing any with the same endpoint.
    pub async fn add_subscription(&self, sub: PushSubscription) -> Result<()> {
        {
            let mut store = self.store.write().await;
            store.subscriptions.retain(|s| s.endpoint != sub.endpoint);
            store.subscriptions.push(sub);
        }
        self.save_store().await?;
        info!("added push subscription");
        Ok(())
    }

    /// Remove a subscription by endpoint.
    pub async fn remove_subscription(&self, endpoint: &str) -> Result<()> {
        {
            let mut store = self.store.write().await;
            let before = store.subscriptions.len();
            store.subscriptions.retain(|s| s.endpoint != endpoint);
            if store.subscriptions.len() < before {
                info!("removed push subscription");
            }
        }
        self.save_store().await
    }

    pub async fn subscription_count(&self) -> usize {
        self.store.read().await.subscriptions.len()
    }

    /// Send a notification to all subscriptions. Returns how many went out.
    pub async fn send_to_all(&self, notification: &Notification) -> Result<usize> {
        let (vapid, subscriptions) = {
            let store = self.store.read().await;
            (store.vapid.clone(), store.subscriptions.clone())
        };

        let Some(vapid) = vapid else {
            warn!("no VAPID keys configured, cannot send push notifications");
            return Ok(0);
        };

        if subscriptions.is_empty() {
            debug!("no push subscriptions, skipping notification");
            return Ok(0);
        }

        let payload = serde_json::to_vec(notification)?;
        let mut sent = 0;
        let mut failed_endpoints = Vec::new();

        for sub in &subscriptions {
            match self.send_to_subscription(&vapid, sub, &payload).await {
                Ok(()) => sent += 1,
                Err(e) => {
                    error!(endpoint = %sub.endpoint, error = %e, "failed to send push notification");
                    // Invalid subscription (410 Gone): mark for removal.
                    if e.to_string().contains("410") || e.to_string().contains("Gone") {
                        failed_endpoints.push(sub.endpoint.clone());
                    }
                },
            }
        }

        if !failed_endpoints.is_empty() {
            let mut store = self.store.write().await;
            store
                .subscriptions
                .retain(|s| !failed_endpoints.contains(&s.endpoint));
            drop(store);
            let _ = self.save_store().await;
        }

        Ok(sent)
    }

    async fn send_to_subscription(
        &self,
        vapid: &VapidKeys,
        sub: &PushSubscription,
        payload: &[u8],
    ) -> Result<()> {
        let subscription_info = SubscriptionInfo {
            endpoint: sub.endpoint.clone(),
            keys: web_push::SubscriptionKeys {
                p256dh: sub.p256dh.clone(),
                auth: sub.auth.clone(),
            },
        };

        let sig_builder =
            VapidSignatureBuilder::from_pem(vapid.private_key_pem.as_bytes(), &subscription_info)?
                .build()?;

        let mut builder = WebPushMessageBuilder::new(&subscription_info);
        builder.set_payload(ContentEncoding::Aes128Gcm, payload);
        builder.set_vapid_signature(sig_builder);

        let message = builder.build()?;
        self.client.send(message).await?;

        debug!(endpoint = %sub.endpoint, "sent push notification");
        Ok(())
    }

    async fn save_store(&self) -> Result<()> {
        let store = self.store.read().await;
        let content = serde_json::to_string_pretty(&*store)?;
        tokio::fs::write(&self.store_path, content).await?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for PushService {
    async fn send(&self, notification: &Notification) -> Result<()> {
        self.send_to_all(notification).await.map(|_| ())
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn sub(endpoint: &str) -> PushSubscription {
        PushSubscription {
            endpoint: endpoint.into(),
            p256dh: "key".into(),
            auth: "secret".into(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn generates_and_persists_vapid_keys() {
        let dir = tempfile::tempdir().unwrap();
        let service = PushService::new(dir.path()).await.unwrap();
        let key = service.vapid_public_key().await.unwrap();
        assert!(!key.is_empty());

        // Reopening loads the same key instead of regenerating.
        let service2 = PushService::new(dir.path()).await.unwrap();
        assert_eq!(service2.vapid_public_key().await.unwrap(), key);
    }

    #[tokio::test]
    async fn subscriptions_dedupe_by_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let service = PushService::new(dir.path()).await.unwrap();

        service.add_subscription(sub("https://p.example/1")).await.unwrap();
        service.add_subscription(sub("https://p.example/1")).await.unwrap();
        service.add_subscription(sub("https://p.example/2")).await.unwrap();
        assert_eq!(service.subscription_count().await, 2);

        service.remove_subscription("https://p.example/1").await.unwrap();
        assert_eq!(service.subscription_count().await, 1);
    }

    #[tokio::test]
    async fn send_with_no_subscriptions_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let service = PushService::new(dir.path()).await.unwrap();
        let sent = service
            .send_to_all(&Notification::new("t", "b"))
            .await
            .unwrap();
        assert_eq!(sent, 0);
    }
}
