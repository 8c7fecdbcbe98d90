//! Realtime transport: a statically linked WebSocket client with explicit
//! connect/disconnect lifecycle, plus the registration flow that obtains
//! its access token.

pub mod connection;
pub mod error;
pub mod listener;
pub mod protocol;
pub mod register;
pub mod seen;

use std::sync::Arc;

use tokio::{sync::mpsc, task::JoinHandle};

use {
    parrot_config::schema::{ServerConfig, WatchConfig},
    parrot_notify::Notifier,
    parrot_store::Store,
    parrot_translate::TranslationChain,
};

pub use crate::{
    connection::{ConnectionManager, SocketEvent, probe, ws_url},
    error::{Error, Result},
    listener::MessageHandler,
    protocol::NewMessage,
    register::register,
};

/// A running socket listener: the connection task plus the handler task.
#[derive(Debug)]
pub struct SocketClient {
    manager: ConnectionManager,
    handler: JoinHandle<()>,
}

impl SocketClient {
    /// Close the connection and stop the handler.
    pub async fn shutdown(self) {
        self.manager.disconnect();
        let _ = self.handler.await;
    }
}

/// Connect to the configured chat server and start handling events.
///
/// Requires both a server URL and a token; registration provides them.
pub fn start(
    server: &ServerConfig,
    watch: WatchConfig,
    store: Arc<Store>,
    chain: Arc<TranslationChain>,
    notifier: Arc<dyn Notifier>,
) -> Result<SocketClient> {
    let url = server
        .url
        .as_deref()
        .ok_or_else(|| Error::Message("server URL not configured".into()))?;
    let token = server
        .token
        .as_deref()
        .ok_or_else(|| Error::Message("access token not configured; run registration".into()))?;

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let manager = ConnectionManager::spawn(
        ws_url(url, &server.ws_path),
        token.to_owned(),
        event_tx,
    );
    let handler = MessageHandler::new(store, chain, notifier, watch);
    let handler = tokio::spawn(handler.run(event_rx));

    Ok(SocketClient { manager, handler })
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn start_requires_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::open(dir.path().to_path_buf(), None).await.unwrap());
        let chain = Arc::new(TranslationChain::new(vec![], "vi"));
        let notifier: Arc<dyn Notifier> = Arc::new(parrot_notify::TracingNotifier);

        let err = start(
            &ServerConfig::default(),
            WatchConfig::default(),
            store.clone(),
            chain.clone(),
            notifier.clone(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("server URL"));

        let server = ServerConfig {
            url: Some("https://chat.example.com".into()),
            ..ServerConfig::default()
        };
        let err = start(&server, WatchConfig::default(), store, chain, notifier).unwrap_err();
        assert!(err.to_string().contains("registration"));
    }
}
