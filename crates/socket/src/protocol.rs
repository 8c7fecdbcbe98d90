//! Wire frames exchanged with the chat server.

use serde::{Deserialize, Serialize};

/// Sent once after the socket opens.
#[derive(Debug, Serialize)]
pub struct AuthChallenge<'a> {
    pub seq: u32,
    pub action: &'static str,
    pub data: AuthData<'a>,
}

#[derive(Debug, Serialize)]
pub struct AuthData<'a> {
    pub token: &'a str,
}

impl<'a> AuthChallenge<'a> {
    pub fn new(token: &'a str) -> Self {
        Self {
            seq: 1,
            action: "authentication_challenge",
            data: AuthData { token },
        }
    }
}

/// Any incoming event frame; only `new_message` is acted on.
#[derive(Debug, Deserialize)]
pub struct EventFrame {
    #[serde(default)]
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Payload of a `new_message` event. `user` and `text` are always present;
/// the server includes the rest when it has them.
#[derive(Debug, Clone, Deserialize)]
pub struct NewMessage {
    pub user: String,
    pub text: String,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    /// Server-side creation time, milliseconds since epoch.
    #[serde(default)]
    pub create_at: Option<u64>,
}

/// Parse one text frame into a [`NewMessage`], if it is one.
pub fn parse_new_message(raw: &str) -> Option<NewMessage> {
    let frame: EventFrame = serde_json::from_str(raw).ok()?;
    if frame.event != "new_message" {
        return None;
    }
    serde_json::from_value(frame.data).ok()
}
