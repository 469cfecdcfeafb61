use serde::Serialize;
use tokio::sync::watch;

use super::connection::ConnectionState;
use crate::infrastructure::TaskManager;
use crate::messaging::{EventHandlers, MessageQueue, SubscriptionTable};

/// Snapshot of a state transition, published to the reconnection watcher.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateSignal {
    pub state: ConnectionState,
    /// Disconnect was requested by the caller; auto-reconnect is suppressed.
    pub manual_close: bool,
    /// The environment reported the network unreachable; reconnection waits
    /// for the matching online signal.
    pub offline: bool,
}

/// Consolidated mutable state for a client instance.
/// Using a single struct reduces lock contention.
pub struct ClientState {
    /// Outbound messages awaiting a live transport
    pub queue: MessageQueue,

    /// Type-keyed subscriber callbacks
    pub subscriptions: SubscriptionTable,

    /// Lifecycle callbacks, reused across reconnects
    pub handlers: EventHandlers,

    /// Background task slots (read loop, heartbeat)
    pub tasks: TaskManager,

    /// Whether the last disconnect was manual (prevents auto-reconnect)
    pub manual_close: bool,

    /// Whether the environment reported the network down
    pub offline: bool,

    /// Whether the heartbeat is paused (page hidden)
    pub heartbeat_paused: bool,

    /// Terminal flag set by `destroy()`
    pub destroyed: bool,

    /// Consecutive failed reconnect attempts since the last successful open
    pub reconnect_attempts: u32,

    /// Whether `on_reconnect_failed` already fired for this outage
    pub reconnect_failed_reported: bool,

    /// Timestamp of the last heartbeat pong (ms since epoch)
    pub last_heartbeat: Option<u64>,

    /// Sender for state change notifications
    pub state_change_tx: Option<watch::Sender<StateSignal>>,
}

impl ClientState {
    pub fn new() -> Self {
        Self {
            queue: MessageQueue::new(),
            subscriptions: SubscriptionTable::new(),
            handlers: EventHandlers::default(),
            tasks: TaskManager::new(),
            manual_close: false,
            offline: false,
            heartbeat_paused: false,
            destroyed: false,
            reconnect_attempts: 0,
            reconnect_failed_reported: false,
            last_heartbeat: None,
            state_change_tx: None,
        }
    }

    /// Publishes a state transition to the watcher, with the current flags.
    pub fn notify_state_change(&self, state: ConnectionState) {
        let signal = StateSignal {
            state,
            manual_close: self.manual_close,
            offline: self.offline,
        };
        if let Some(tx) = &self.state_change_tx {
            if tx.send(signal).is_err() {
                tracing::debug!("State watcher gone, could not notify state: {:?}", state);
            }
        }
    }
}

impl Default for ClientState {
    fn default() -> Self {
        Self::new()
    }
}

/// Synchronous snapshot returned by `WsClient::stats()`.
#[derive(Debug, Clone, Serialize)]
pub struct ClientStats {
    pub state: ConnectionState,
    pub reconnect_attempts: u32,
    pub queued_messages: usize,
    pub subscribed_types: Vec<String>,
    pub last_heartbeat: Option<u64>,
}
