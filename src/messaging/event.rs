use std::sync::Arc;

use crate::client::ConnectionState;
use crate::types::{NetworkError, WsMessage};

/// Callback invoked when a message of a subscribed type arrives.
pub type MessageHandler = Arc<dyn Fn(&WsMessage) + Send + Sync>;

/// Callback invoked on transport errors.
pub type ErrorHandler = Arc<dyn Fn(&NetworkError) + Send + Sync>;

/// Callback invoked when the transport closes, with the close code if known.
pub type CloseHandler = Arc<dyn Fn(Option<u16>) + Send + Sync>;

/// Callback invoked on every connection state transition.
pub type StateHandler = Arc<dyn Fn(ConnectionState) + Send + Sync>;

/// Callback invoked before each reconnect attempt, with the attempt number.
pub type AttemptHandler = Arc<dyn Fn(u32) + Send + Sync>;

/// Callback with no arguments (open, reconnect success/failure).
pub type NotifyHandler = Arc<dyn Fn() + Send + Sync>;

/// Optional lifecycle callbacks, registered at connect time and reused across
/// reconnects. All are invoked synchronously from the client's event handling.
#[derive(Clone, Default)]
pub struct EventHandlers {
    pub on_open: Option<NotifyHandler>,
    pub on_message: Option<MessageHandler>,
    pub on_error: Option<ErrorHandler>,
    pub on_close: Option<CloseHandler>,
    pub on_state_change: Option<StateHandler>,
    pub on_reconnect_attempt: Option<AttemptHandler>,
    pub on_reconnect_success: Option<NotifyHandler>,
    pub on_reconnect_failed: Option<NotifyHandler>,
}

/// Host environment signals the embedder forwards to the client.
///
/// These mirror page visibility and network reachability events: the client
/// pauses its heartbeat while hidden and defers reconnection while offline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentEvent {
    /// The page/tab became hidden; heartbeat pauses.
    Hidden,
    /// The page/tab became visible again; heartbeat resumes.
    Visible,
    /// Network reachability restored; reconnect if not manually closed.
    Online,
    /// Network reachability lost; mark disconnected without closing.
    Offline,
}

/// Outcome of a `send` call. Transmission failures are converted to
/// queueing rather than surfaced as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    /// The message was handed to the open transport.
    Sent,
    /// The transport was unavailable; the message was buffered for the next
    /// successful connection.
    Queued,
}

impl SendStatus {
    pub fn is_sent(self) -> bool {
        matches!(self, SendStatus::Sent)
    }
}
