use std::sync::Arc;
use tokio::sync::RwLock;

use super::subscriptions::invoke_all;
use crate::client::ClientState;
use crate::types::message::now_millis;
use crate::types::WsMessage;

/// Routes inbound frames to the client's handlers and subscribers.
pub struct MessageRouter {
    state: Arc<RwLock<ClientState>>,
    enable_logging: bool,
}

impl MessageRouter {
    pub fn new(state: Arc<RwLock<ClientState>>, enable_logging: bool) -> Self {
        Self {
            state,
            enable_logging,
        }
    }

    /// Decodes a text frame, downgrading undecodable payloads to a raw
    /// pass-through message instead of surfacing an error.
    pub fn decode(raw: &str) -> WsMessage {
        match serde_json::from_str::<WsMessage>(raw) {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!("Undecodable frame ({}), passing through as raw text", e);
                WsMessage::raw_fallback(raw)
            }
        }
    }

    /// Delivers a message to the `on_message` handler and to every subscriber
    /// registered for its type.
    pub async fn route(&self, message: WsMessage) {
        if self.enable_logging {
            tracing::debug!(
                "Received message: type={}, payload={}",
                message.kind,
                serde_json::to_string(&message.data).unwrap_or_default()
            );
        }

        // Heartbeat acknowledgment: record liveness, then fall through so
        // explicit pong subscribers still see the message.
        if message.is_pong() {
            self.state.write().await.last_heartbeat = Some(now_millis());
            tracing::debug!("Received heartbeat pong");
        }

        // Clone callbacks out of the lock before invoking them: a handler
        // must never run while the client state is held.
        let (on_message, subscribers) = {
            let state = self.state.read().await;
            (
                state.handlers.on_message.clone(),
                state.subscriptions.handlers_for(&message.kind),
            )
        };

        if let Some(handler) = on_message {
            handler(&message);
        }

        let delivered = invoke_all(&subscribers, &message);
        if self.enable_logging && delivered > 0 {
            tracing::debug!("Delivered '{}' to {} subscriber(s)", message.kind, delivered);
        }
    }
}
