//! WebSocket connection management with auto-reconnect.

use std::time::Duration;

use {
    futures::{SinkExt, StreamExt},
    tokio::sync::mpsc,
    tokio_tungstenite::{connect_async, tungstenite::Message},
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info},
};

use crate::{
    error::{Error, Result},
    protocol::{AuthChallenge, NewMessage, parse_new_message},
};

/// Maximum reconnect backoff delay.
const MAX_BACKOFF: Duration = Duration::from_secs(5);

/// Events sent from the connection task to the message handler.
#[derive(Debug)]
pub enum SocketEvent {
    Connected,
    Disconnected,
    Error(String),
    Message(NewMessage),
}

/// Manages the WebSocket connection to the chat server: connect,
/// authenticate, forward events, reconnect with exponential backoff.
#[derive(Debug)]
pub struct ConnectionManager {
    cancel: CancellationToken,
}

impl ConnectionManager {
    /// Spawn the connection manager. Returns immediately; the connection
    /// runs in a background task until [`disconnect`](Self::disconnect).
    pub fn spawn(url: String, token: String, event_tx: mpsc::UnboundedSender<SocketEvent>) -> Self {
        let cancel = CancellationToken::new();
        tokio::spawn(connection_loop(url, token, event_tx, cancel.clone()));
        Self { cancel }
    }

    /// Explicitly close the connection and stop reconnecting.
    pub fn disconnect(&self) {
        self.cancel.cancel();
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// One-shot connection attempt: connect, authenticate, close.
///
/// Used right after registration to confirm the stored credentials reach
/// the server; the long-lived connection belongs to [`ConnectionManager`].
pub async fn probe(url: &str, token: &str) -> Result<()> {
    let (ws_stream, _response) = connect_async(url).await?;
    let (mut ws_sink, _ws_reader) = ws_stream.split();
    let challenge = serde_json::to_string(&AuthChallenge::new(token))?;
    ws_sink.send(Message::Text(challenge.into())).await?;
    let _ = ws_sink.send(Message::Close(None)).await;
    Ok(())
}

/// Derive the websocket URL from the server base URL and path.
#[must_use]
pub fn ws_url(server_url: &str, ws_path: &str) -> String {
    let base = server_url.trim_end_matches('/');
    let base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base.to_owned()
    };
    format!("{base}{ws_path}")
}

/// Main connection loop with auto-reconnect.
///
/// Backoff starts at 1s, doubles on failure up to [`MAX_BACKOFF`], and
/// resets after a connection that completed its handshake.
async fn connection_loop(
    url: String,
    token: String,
    event_tx: mpsc::UnboundedSender<SocketEvent>,
    cancel: CancellationToken,
) {
    let mut backoff = Duration::from_secs(1);

    loop {
        if cancel.is_cancelled() {
            return;
        }
        info!(url = %url, "connecting to chat server");

        match connect_and_run(&url, &token, &event_tx, &cancel).await {
            Ok(()) => {
                debug!("connection closed cleanly");
                backoff = Duration::from_secs(1);
            },
            Err(e) => {
                error!(error = %e, "connection error");
                let _ = event_tx.send(SocketEvent::Error(e.to_string()));
            },
        }

        let _ = event_tx.send(SocketEvent::Disconnected);
        if cancel.is_cancelled() {
            return;
        }

        info!(delay_ms = backoff.as_millis(), "reconnecting after delay");
        tokio::select! {
            () = tokio::time::sleep(backoff) => {},
            () = cancel.cancelled() => return,
        }
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }
}

/// Single connection attempt: connect, authenticate, then forward events.
async fn connect_and_run(
    url: &str,
    token: &str,
    event_tx: &mpsc::UnboundedSender<SocketEvent>,
    cancel: &CancellationToken,
) -> Result<()> {
    let (ws_stream, _response) = connect_async(url).await?;
    let (mut ws_sink, mut ws_reader) = ws_stream.split();

    // Authenticate before anything else.
    let challenge = serde_json::to_string(&AuthChallenge::new(token))?;
    ws_sink.send(Message::Text(challenge.into())).await?;

    let _ = event_tx.send(SocketEvent::Connected);

    loop {
        tokio::select! {
            msg = ws_reader.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(new_message) = parse_new_message(&text) {
                            let _ = event_tx.send(SocketEvent::Message(new_message));
                        }
                    },
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("websocket closed by server");
                        return Ok(());
                    },
                    Some(Ok(Message::Ping(data))) => {
                        ws_sink.send(Message::Pong(data)).await?;
                    },
                    Some(Ok(_)) => {}, // Ignore binary, pong, etc.
                    Some(Err(e)) => {
                        return Err(Error::WebSocket(e));
                    },
                }
            },
            () = cancel.cancelled() => {
                let _ = ws_sink.send(Message::Close(None)).await;
                return Ok(());
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ws_url_rewrites_scheme() {
        assert_eq!(
            ws_url("https://chat.example.com", "/api/v4/websocket"),
            "wss://chat.example.com/api/v4/websocket"
        );
        assert_eq!(
            ws_url("http://localhost:8065/", "/api/v4/websocket"),
            "ws://localhost:8065/api/v4/websocket"
        );
    }

    #[test]
    fn ws_url_passes_through_ws_schemes() {
        assert_eq!(ws_url("ws://h", "/sock"), "ws://h/sock");
        assert_eq!(ws_url("wss://h/", "/sock"), "wss://h/sock");
    }
}
