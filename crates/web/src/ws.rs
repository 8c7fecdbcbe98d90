//! Live-update channel: forwards store events to open views so they
//! re-render on change.

use {
    axum::{
        extract::{
            State, WebSocketUpgrade,
            ws::{Message, WebSocket},
        },
        response::IntoResponse,
    },
    futures::{SinkExt, stream::StreamExt},
    tokio::sync::broadcast,
    tracing::debug,
};

use parrot_store::StoreEvent;

use crate::AppState;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Forward store events to one client until it disconnects. A lagged
/// receiver just skips ahead, since every message triggers a full re-read on the
/// client side anyway.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let mut events = state.store.subscribe();
    let (mut ws_tx, mut ws_rx) = socket.split();

    loop {
        tokio::select! {
            event = events.recv() => {
                let frame = match event {
                    Ok(event) => event_json(&event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "ws client lagged behind store events");
                        continue;
                    },
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                if ws_tx.send(Message::Text(frame.into())).await.is_err() {
                    break;
                }
            },
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    Some(Ok(_)) => {}, // Ignore anything the page sends.
                }
            },
        }
    }
    debug!("ws client disconnected");
}

fn event_json(event: &StoreEvent) -> String {
    let value = match event {
        StoreEvent::LogAppended(entry) => serde_json::json!({
            "event": "log.appended",
            "payload": entry,
        }),
        StoreEvent::UnreadChanged(unread) => serde_json::json!({
            "event": "unread.changed",
            "payload": unread,
        }),
    };
    value.to_string()
}
