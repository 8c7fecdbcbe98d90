//! Browser-facing handlers: the two views, the JSON log API, the
//! clear-unread action, and push subscription management.

use {
    askama::Template,
    axum::{
        Json,
        extract::{Query, State},
        http::StatusCode,
        response::{Html, IntoResponse},
    },
    serde::Deserialize,
    tracing::warn,
};

use parrot_notify::PushSubscription;

use crate::{
    AppState,
    templates::{LogPageTemplate, PopupTemplate, RECENT_LIMIT, popup_entries},
};

/// `GET /`: the popup, with the unread badge plus the most recent entries.
pub async fn popup_handler(State(state): State<AppState>) -> impl IntoResponse {
    let unread = state.store.unread().await;
    let entries = match state.store.recent(RECENT_LIMIT).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!(error = %e, "failed to read log");
            return (StatusCode::INTERNAL_SERVER_ERROR, "log unavailable").into_response();
        },
    };
    let template = PopupTemplate {
        unread,
        entries: popup_entries(entries),
    };
    render(template)
}

/// `GET /log`: the full log, oldest first.
pub async fn log_page_handler(State(state): State<AppState>) -> impl IntoResponse {
    let entries = match state.store.all_entries().await {
        Ok(entries) => entries,
        Err(e) => {
            warn!(error = %e, "failed to read log");
            return (StatusCode::INTERNAL_SERVER_ERROR, "log unavailable").into_response();
        },
    };
    render(LogPageTemplate { entries })
}

fn render<T: Template>(template: T) -> axum::response::Response {
    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            warn!(error = %e, "template render failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "render failed").into_response()
        },
    }
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub limit: Option<usize>,
}

/// `GET /api/logs`: entries as JSON, most recent `limit` (default all).
pub async fn api_logs_handler(
    Query(query): Query<LogsQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let result = match query.limit {
        Some(limit) => state.store.recent(limit).await,
        None => state.store.all_entries().await,
    };
    match result {
        Ok(entries) => Json(entries).into_response(),
        Err(e) => {
            warn!(error = %e, "failed to read log");
            (StatusCode::INTERNAL_SERVER_ERROR, "log unavailable").into_response()
        },
    }
}

/// `POST /api/unread/clear`: reset the unread counter. Log entries are
/// retained; only the badge goes away.
pub async fn clear_unread_handler(State(state): State<AppState>) -> impl IntoResponse {
    if let Err(e) = state.store.clear_unread().await {
        warn!(error = %e, "failed to clear unread");
        return (StatusCode::INTERNAL_SERVER_ERROR, "clear failed").into_response();
    }
    if let Some(notifier) = &state.notifier {
        // Clearing counts as user attention: arm the suppress window.
        notifier.suppress().await;
    }
    Json(serde_json::json!({"ok": true})).into_response()
}

// ── Push subscriptions ──────────────────────────────────────────────────────

/// `GET /api/push/key`: the VAPID public key for the browser.
pub async fn push_key_handler(State(state): State<AppState>) -> impl IntoResponse {
    let Some(push) = &state.push else {
        return (StatusCode::NOT_FOUND, "push not configured").into_response();
    };
    match push.vapid_public_key().await {
        Some(key) => Json(serde_json::json!({"key": key})).into_response(),
        None => (StatusCode::NOT_FOUND, "no VAPID key").into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct SubscribeBody {
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
}

/// `POST /api/push/subscribe`: store a browser push subscription.
pub async fn push_subscribe_handler(
    State(state): State<AppState>,
    Json(body): Json<SubscribeBody>,
) -> impl IntoResponse {
    let Some(push) = &state.push else {
        return (StatusCode::NOT_FOUND, "push not configured").into_response();
    };
    let sub = PushSubscription::new(body.endpoint, body.p256dh, body.auth);
    match push.add_subscription(sub).await {
        Ok(()) => Json(serde_json::json!({"ok": true})).into_response(),
        Err(e) => {
            warn!(error = %e, "failed to store subscription");
            (StatusCode::INTERNAL_SERVER_ERROR, "subscribe failed").into_response()
        },
    }
}

#[derive(Debug, Deserialize)]
pub struct UnsubscribeBody {
    pub endpoint: String,
}

/// `DELETE /api/push/subscribe`: drop a subscription by endpoint.
pub async fn push_unsubscribe_handler(
    State(state): State<AppState>,
    Json(body): Json<UnsubscribeBody>,
) -> impl IntoResponse {
    let Some(push) = &state.push else {
        return (StatusCode::NOT_FOUND, "push not configured").into_response();
    };
    match push.remove_subscription(&body.endpoint).await {
        Ok(()) => Json(serde_json::json!({"ok": true})).into_response(),
        Err(e) => {
            warn!(error = %e, "failed to remove subscription");
            (StatusCode::INTERNAL_SERVER_ERROR, "unsubscribe failed").into_response()
        },
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parrot_store::{LogEntry, Store};

    use super::*;

    async fn state() -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::open(dir.path().to_path_buf(), None).await.unwrap());
        (
            AppState {
                store,
                notifier: None,
                push: None,
            },
            dir,
        )
    }

    #[tokio::test]
    async fn clear_unread_resets_counter() {
        let (state, _dir) = state().await;
        for _ in 0..7 {
            state.store.bump_unread().await.unwrap();
        }

        clear_unread_handler(State(state.clone())).await;

        assert_eq!(state.store.unread().await, 0);
    }

    #[tokio::test]
    async fn clear_unread_keeps_entries() {
        let (state, _dir) = state().await;
        state
            .store
            .append_entry(LogEntry::new("alice", "general", "hi", ""))
            .await
            .unwrap();
        state.store.bump_unread().await.unwrap();

        clear_unread_handler(State(state.clone())).await;

        assert_eq!(state.store.entry_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn push_handlers_404_without_service() {
        let (state, _dir) = state().await;
        let resp = push_key_handler(State(state)).await.into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
