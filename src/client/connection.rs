use futures::stream::SplitSink;
use futures::SinkExt;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

use crate::types::{Result, WsError, WsMessage};
use crate::websocket::WsStream;

/// Connection lifecycle states. Exactly one is active at a time; transitions
/// are driven only by transport events and explicit `connect`/`disconnect`
/// calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
    Reconnecting,
    Error,
    Closed,
}

/// Owns the write half of the transport and the current connection state.
pub struct ConnectionManager {
    ws_write: Arc<RwLock<Option<SplitSink<WsStream, Message>>>>,
    state: Arc<RwLock<ConnectionState>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            ws_write: Arc::new(RwLock::new(None)),
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
        }
    }

    /// Installs the write sink after a successful handshake.
    pub async fn set_writer(&self, writer: SplitSink<WsStream, Message>) {
        let mut ws = self.ws_write.write().await;
        *ws = Some(writer);
    }

    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    pub async fn set_state(&self, new_state: ConnectionState) {
        let mut state = self.state.write().await;
        *state = new_state;
    }

    /// True only when the state says connected and a live write sink exists,
    /// guarding against a race between transport events and bookkeeping.
    pub async fn is_connected(&self) -> bool {
        if *self.state.read().await != ConnectionState::Connected {
            return false;
        }
        self.ws_write.read().await.is_some()
    }

    /// Serializes and transmits a message over the open transport.
    pub async fn send_message(&self, message: &WsMessage) -> Result<()> {
        let json = serde_json::to_string(message)?;

        let mut ws_guard = self.ws_write.write().await;
        match ws_guard.as_mut() {
            Some(ws) => {
                ws.send(Message::Text(json.into())).await?;
                Ok(())
            }
            None => Err(WsError::NotConnected),
        }
    }

    /// Closes the transport with a normal-closure code and drops the writer.
    pub async fn close(&self) -> Result<()> {
        let mut ws_guard = self.ws_write.write().await;
        if let Some(ws) = ws_guard.as_mut() {
            let frame = CloseFrame {
                code: CloseCode::Normal,
                reason: "client disconnect".into(),
            };
            // Best effort: the peer may already be gone
            let _ = ws.send(Message::Close(Some(frame))).await;
            let _ = ws.close().await;
        }
        *ws_guard = None;
        Ok(())
    }

    /// Drops the writer without a close handshake (transport already dead).
    pub async fn clear_writer(&self) {
        let mut ws = self.ws_write.write().await;
        *ws = None;
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}
