use std::sync::Weak;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time;

use crate::client::{ClientState, ConnectionManager};
use crate::types::constants::DEFAULT_HEARTBEAT_INTERVAL;
use crate::types::message::WsMessage;

/// Periodically sends `ping` messages while the connection is open.
///
/// The heartbeat only produces a liveness signal: the `pong` handler records
/// a timestamp for `stats()`, and a missed pong never forces a disconnect.
/// Failure detection is left to the transport's own close/error events.
pub struct HeartbeatManager {
    interval: Duration,
    connection: Weak<ConnectionManager>,
    state: Weak<RwLock<ClientState>>,
}

impl HeartbeatManager {
    pub fn new(connection: Weak<ConnectionManager>, state: Weak<RwLock<ClientState>>) -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_HEARTBEAT_INTERVAL),
            connection,
            state,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Spawns the heartbeat task that runs periodically.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval_timer = time::interval(self.interval);
            interval_timer.set_missed_tick_behavior(time::MissedTickBehavior::Skip);
            // Skip the immediate first tick so the initial ping waits one period
            interval_timer.tick().await;

            loop {
                interval_timer.tick().await;

                let connection = match self.connection.upgrade() {
                    Some(conn) => conn,
                    None => break,
                };
                let state = match self.state.upgrade() {
                    Some(state) => state,
                    None => break,
                };

                // Paused while the host environment reports the page hidden
                if state.read().await.heartbeat_paused {
                    continue;
                }

                if !connection.is_connected().await {
                    continue;
                }

                let ping = WsMessage::ping();
                match connection.send_message(&ping).await {
                    Ok(()) => tracing::debug!("Sent heartbeat ping"),
                    Err(e) => tracing::warn!("Failed to send heartbeat ping: {}", e),
                }
            }
        })
    }
}
