use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use super::constants::reserved_types;

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// A single message exchanged over the transport.
///
/// Every frame is a UTF-8 JSON text payload of this shape. The `id` is a
/// locally generated token used only for diagnostics; the server neither
/// deduplicates nor acknowledges by it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WsMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default = "now_millis")]
    pub timestamp: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl WsMessage {
    /// Builds an outbound message with a fresh diagnostic id.
    pub fn new(kind: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            data,
            timestamp: now_millis(),
            id: Some(uuid::Uuid::new_v4().to_string()),
        }
    }

    /// Wraps an undecodable inbound frame as a raw pass-through message.
    pub fn raw_fallback(raw: &str) -> Self {
        Self {
            kind: reserved_types::RAW_MESSAGE.to_string(),
            data: serde_json::Value::String(raw.to_string()),
            timestamp: now_millis(),
            id: None,
        }
    }

    /// Heartbeat probe message.
    pub fn ping() -> Self {
        Self::new(reserved_types::PING, serde_json::json!({}))
    }

    pub fn is_pong(&self) -> bool {
        self.kind == reserved_types::PONG
    }
}
