//! Web UI: the popup view, the full-log view, the JSON API, and the
//! live-update WebSocket. All user-supplied text passes through askama's
//! HTML escaping on render.

pub mod api;
pub mod error;
pub mod templates;
pub mod ws;

use std::sync::Arc;

use {
    axum::{
        Router,
        routing::{get, post},
    },
    tracing::info,
};

use {
    parrot_notify::{GatedNotifier, PushService},
    parrot_store::Store,
};

pub use crate::error::{Error, Result};

/// Shared services handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub notifier: Option<Arc<GatedNotifier>>,
    pub push: Option<Arc<PushService>>,
}

/// Build the router: pages, API routes, and the live-update socket.
pub fn web_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(api::popup_handler))
        .route("/log", get(api::log_page_handler))
        .route("/api/logs", get(api::api_logs_handler))
        .route("/api/unread/clear", post(api::clear_unread_handler))
        .route("/api/push/key", get(api::push_key_handler))
        .route(
            "/api/push/subscribe",
            post(api::push_subscribe_handler).delete(api::push_unsubscribe_handler),
        )
        .route("/ws", get(ws::ws_handler))
        .with_state(state)
}

/// Bind and serve until the task is aborted.
pub async fn serve(bind: &str, port: u16, state: AppState) -> Result<()> {
    let addr = format!("{bind}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::message(format!("failed to bind {addr}: {e}")))?;
    info!(addr = %addr, "web UI listening");
    axum::serve(listener, web_routes(state))
        .await
        .map_err(|e| Error::message(format!("server error: {e}")))
}
