use futures::stream::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio_tungstenite::tungstenite::Message;

use super::{ClientState, ClientStats, ConnectionManager, ConnectionState, WsClientBuilder,
    WsClientOptions};
use crate::infrastructure::{Backoff, HeartbeatManager};
use crate::messaging::{
    EnvironmentEvent, EventHandlers, MessageRouter, SendStatus, Subscription,
};
use crate::types::error::report_to_sink;
use crate::types::{NetworkError, Result, WsError, WsMessage};
use crate::websocket::WebSocketFactory;

/// A resilient WebSocket client.
///
/// `WsClient` owns one logical connection to a server endpoint and abstracts
/// reconnection, liveness checking, and outbound buffering from callers:
///
/// - unexpected disconnects trigger automatic reconnection with exponential
///   backoff, up to a configurable attempt ceiling
/// - a periodic heartbeat records server liveness for [`stats`](Self::stats)
/// - messages sent while the transport is down are buffered in a bounded
///   FIFO queue and flushed in order on the next successful connection
/// - inbound messages fan out to type-keyed subscribers
///
/// # Example
///
/// ```no_run
/// use resilient_ws::{WsClient, WsClientOptions};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = WsClient::new(WsClientOptions::new("wss://example.com/ws"))?;
/// client.connect().await?;
///
/// let _sub = client
///     .subscribe("notification", |msg| {
///         println!("notification: {}", msg.data);
///     })
///     .await;
///
/// client.send("chat", serde_json::json!({ "msg": "hi" })).await;
/// client.disconnect().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct WsClient {
    pub(crate) options: WsClientOptions,
    pub(crate) connection: Arc<ConnectionManager>,
    pub(crate) state: Arc<RwLock<ClientState>>,
    connect_lock: Arc<Mutex<()>>,
}

impl WsClient {
    /// Creates a new client. Validates the endpoint URL and spawns the
    /// reconnection watcher; no connection is opened until
    /// [`connect()`](Self::connect).
    ///
    /// Must be called within a tokio runtime.
    pub fn new(options: WsClientOptions) -> Result<Self> {
        WsClientBuilder::new(options).map(|builder| builder.build())
    }

    pub(crate) fn from_parts(
        options: WsClientOptions,
        connection: Arc<ConnectionManager>,
        state: Arc<RwLock<ClientState>>,
    ) -> Self {
        Self {
            options,
            connection,
            state,
            connect_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Establishes the WebSocket connection.
    ///
    /// Idempotent: returns immediately when already connected or connecting,
    /// without opening a second transport. On success the reconnect counter
    /// resets, the heartbeat starts (if enabled), queued messages are flushed
    /// in order, and `on_open` fires.
    ///
    /// # Errors
    ///
    /// [`WsError::ConnectionTimeout`] if the handshake misses the configured
    /// deadline, [`WsError::WebSocket`] for handshake failures,
    /// [`WsError::Destroyed`] after [`destroy()`](Self::destroy), and
    /// [`WsError::Cancelled`] when a concurrent
    /// [`disconnect()`](Self::disconnect) aborts the attempt. Connection
    /// errors are also reported to `on_error` and the global error sink.
    pub async fn connect(&self) -> Result<()> {
        let _guard = self.connect_lock.lock().await;

        if self.state.read().await.destroyed {
            return Err(WsError::Destroyed);
        }

        {
            let state = self.connection.state().await;
            if state == ConnectionState::Connected || state == ConnectionState::Connecting {
                return Ok(());
            }
        }

        // An explicit connect resumes after an earlier disconnect or offline
        // period. Cleared up front so a disconnect() arriving during the
        // handshake is visible afterwards.
        {
            let mut state = self.state.write().await;
            state.manual_close = false;
            state.offline = false;
        }

        self.set_state(ConnectionState::Connecting).await;
        tracing::info!("Connecting to {}", self.options.url);

        let timeout = Duration::from_millis(self.options.connection_timeout);
        let mut ws_stream =
            match WebSocketFactory::create(&self.options.url, &self.options.protocols, timeout)
                .await
            {
                Ok(stream) => stream,
                Err(e) => {
                    tracing::error!("Connection attempt failed: {}", e);
                    self.report_error(&e).await;
                    self.set_state(ConnectionState::Error).await;
                    return Err(e);
                }
            };

        // A disconnect() issued while the handshake was in flight wins: drop
        // the fresh transport and leave the Closed state it set in place.
        {
            let mut state = self.state.write().await;
            if state.manual_close {
                drop(state);
                if let Err(e) = ws_stream.close(None).await {
                    tracing::debug!("Closing cancelled transport failed: {}", e);
                }
                tracing::info!("Connect cancelled by a disconnect during the handshake");
                return Err(WsError::Cancelled);
            }
            state.reconnect_attempts = 0;
            state.reconnect_failed_reported = false;
        }

        let (write_half, mut read_half) = ws_stream.split();
        self.connection.set_writer(write_half).await;

        // Read loop: decodes frames and routes them until the transport dies
        let router = MessageRouter::new(Arc::clone(&self.state), self.options.enable_logging);
        let self_cloned = self.clone();
        let read_handle = tokio::spawn(async move {
            tracing::debug!("Read task started");
            let mut close_handled = false;

            while let Some(msg_result) = read_half.next().await {
                match msg_result {
                    Ok(Message::Text(text)) => {
                        router.route(MessageRouter::decode(text.as_str())).await;
                    }
                    Ok(Message::Close(frame)) => {
                        let code = frame.as_ref().map(|f| u16::from(f.code));
                        tracing::warn!("Server closed connection (code={:?})", code);
                        self_cloned.handle_transport_closed(code).await;
                        close_handled = true;
                        break;
                    }
                    Ok(Message::Ping(data)) => {
                        tracing::debug!("Received transport ping ({} bytes)", data.len());
                    }
                    Ok(Message::Pong(data)) => {
                        tracing::debug!("Received transport pong ({} bytes)", data.len());
                    }
                    Ok(Message::Binary(data)) => {
                        tracing::warn!("Ignoring unexpected binary frame ({} bytes)", data.len());
                    }
                    Ok(Message::Frame(_)) => {
                        tracing::debug!("Received raw frame (internal)");
                    }
                    Err(e) => {
                        tracing::error!("WebSocket read error: {}", e);
                        self_cloned.report_error(&WsError::WebSocket(e)).await;
                        self_cloned.handle_transport_closed(None).await;
                        close_handled = true;
                        break;
                    }
                }
            }

            if !close_handled {
                self_cloned.handle_transport_closed(None).await;
            }
            tracing::debug!("Read task finished");
        });
        self.state.write().await.tasks.set_reader(read_handle);

        if self.options.enable_heartbeat {
            let heartbeat = HeartbeatManager::new(
                Arc::downgrade(&self.connection),
                Arc::downgrade(&self.state),
            )
            .with_interval(Duration::from_millis(self.options.heartbeat_interval));
            let handle = heartbeat.spawn();
            self.state.write().await.tasks.set_heartbeat(handle);
        }

        self.set_state(ConnectionState::Connected).await;
        tracing::info!("Connected to {}", self.options.url);

        let on_open = { self.state.read().await.handlers.on_open.clone() };
        if let Some(cb) = on_open {
            cb();
        }

        self.flush_queue().await;
        Ok(())
    }

    /// Stores lifecycle handlers (reused across reconnects), then connects.
    pub async fn connect_with(&self, handlers: EventHandlers) -> Result<()> {
        self.state.write().await.handlers = handlers;
        self.connect().await
    }

    /// Gracefully disconnects and suppresses automatic reconnection.
    ///
    /// Aborts the read and heartbeat tasks, closes the transport with a
    /// normal-closure code, and transitions to `Closed`. Safe to call when
    /// already disconnected. A later [`connect()`](Self::connect) reconnects.
    pub async fn disconnect(&self) -> Result<()> {
        let was_closed = self.connection.state().await == ConnectionState::Closed;

        {
            let mut state = self.state.write().await;
            state.manual_close = true;
            state.tasks.abort_all();
        }

        if was_closed {
            self.set_state(ConnectionState::Closed).await;
            return Ok(());
        }

        tracing::info!("Disconnecting from {}", self.options.url);
        self.connection.close().await?;
        self.set_state(ConnectionState::Closed).await;

        let on_close = { self.state.read().await.handlers.on_close.clone() };
        if let Some(cb) = on_close {
            cb(Some(1000));
        }
        Ok(())
    }

    /// Sends a message, or buffers it when the transport is unavailable.
    ///
    /// Never returns an error: a failed or impossible transmission enqueues
    /// the message (evicting the oldest entry if the queue is full) and
    /// returns [`SendStatus::Queued`].
    pub async fn send(&self, kind: &str, data: serde_json::Value) -> SendStatus {
        let message = WsMessage::new(kind, data);

        if self.connection.is_connected().await {
            match self.connection.send_message(&message).await {
                Ok(()) => {
                    if self.options.enable_logging {
                        tracing::debug!("Sent message type={}", kind);
                    }
                    return SendStatus::Sent;
                }
                Err(e) => {
                    tracing::warn!("Send failed ({}), queueing message type={}", e, kind);
                }
            }
        }

        let evicted = self.state.write().await.queue.push(message);
        if let Some(dropped) = evicted {
            tracing::warn!(
                "Message queue full, dropped oldest entry (type={})",
                dropped.kind
            );
        }
        SendStatus::Queued
    }

    /// Registers a handler for inbound messages of the given type.
    ///
    /// Multiple subscribers per type are permitted; every handler runs for
    /// each matching message, and a panicking handler cannot block the rest.
    /// Dropping the returned [`Subscription`] does not unsubscribe; call
    /// [`Subscription::unsubscribe`].
    pub async fn subscribe<F>(&self, kind: &str, handler: F) -> Subscription
    where
        F: Fn(&WsMessage) + Send + Sync + 'static,
    {
        let id = self
            .state
            .write()
            .await
            .subscriptions
            .insert(kind, Arc::new(handler));
        Subscription::new(kind.to_string(), id, Arc::downgrade(&self.state))
    }

    /// Current connection state.
    pub async fn state(&self) -> ConnectionState {
        self.connection.state().await
    }

    /// True only when the state is `Connected` and the transport agrees.
    pub async fn is_connected(&self) -> bool {
        self.connection.is_connected().await
    }

    /// Snapshot of connection state, reconnect attempts, queue depth, active
    /// subscription types, and last heartbeat response.
    pub async fn stats(&self) -> ClientStats {
        let state = self.connection.state().await;
        let guard = self.state.read().await;
        ClientStats {
            state,
            reconnect_attempts: guard.reconnect_attempts,
            queued_messages: guard.queue.len(),
            subscribed_types: guard.subscriptions.kinds(),
            last_heartbeat: guard.last_heartbeat,
        }
    }

    /// Forwards a host environment signal (page visibility or network
    /// reachability) to the client.
    pub async fn handle_environment(&self, event: EnvironmentEvent) {
        match event {
            EnvironmentEvent::Hidden => {
                self.state.write().await.heartbeat_paused = true;
                tracing::debug!("Heartbeat paused (page hidden)");
            }
            EnvironmentEvent::Visible => {
                self.state.write().await.heartbeat_paused = false;
                tracing::debug!("Heartbeat resumed (page visible)");
            }
            EnvironmentEvent::Offline => {
                self.state.write().await.offline = true;
                // Mark disconnected without forcing transport closure; the
                // offline flag keeps the watcher from retrying into a dead
                // network.
                self.set_state(ConnectionState::Disconnected).await;
                tracing::info!("Network reported offline");
            }
            EnvironmentEvent::Online => {
                let manual_close = {
                    let mut state = self.state.write().await;
                    state.offline = false;
                    state.manual_close
                };
                tracing::info!("Network reported online");
                if !manual_close && !self.is_connected().await {
                    let client = self.clone();
                    tokio::spawn(async move {
                        client.try_reconnect().await;
                    });
                }
            }
        }
    }

    /// Terminal teardown: disconnects, clears all subscriptions, queued
    /// messages, and handlers, and stops the reconnection watcher. The
    /// client refuses further `connect()` calls.
    pub async fn destroy(&self) {
        if let Err(e) = self.disconnect().await {
            tracing::warn!("Disconnect during destroy failed: {}", e);
        }
        let mut state = self.state.write().await;
        state.destroyed = true;
        state.subscriptions.clear();
        state.queue.clear();
        state.handlers = EventHandlers::default();
        // Dropping the sender closes the watch channel, which ends the
        // reconnection watcher task and releases its client handle.
        state.state_change_tx = None;
    }

    /// Retry loop driven by the reconnection watcher.
    ///
    /// Each cycle increments the attempt counter, waits the backoff delay
    /// `min(reconnect_interval * 2^(n-1), 30s)`, and retries `connect()`.
    /// Exhausting the ceiling fires `on_reconnect_failed` once; a manual
    /// `connect()` is then required to resume.
    pub(crate) async fn try_reconnect(&self) {
        let backoff = Backoff::new(self.options.reconnect_interval);

        loop {
            {
                let state = self.connection.state().await;
                if state == ConnectionState::Connected || state == ConnectionState::Connecting {
                    break;
                }
            }

            let attempt = {
                let mut state = self.state.write().await;
                if state.manual_close || state.offline || state.destroyed {
                    return;
                }
                if state.reconnect_attempts >= self.options.max_reconnect_attempts {
                    drop(state);
                    self.report_reconnect_failed().await;
                    return;
                }
                state.reconnect_attempts += 1;
                state.reconnect_attempts
            };

            self.set_state(ConnectionState::Reconnecting).await;

            let on_attempt = { self.state.read().await.handlers.on_reconnect_attempt.clone() };
            if let Some(cb) = on_attempt {
                cb(attempt);
            }

            let delay = backoff.delay_for(attempt);
            tracing::info!(
                "Reconnect attempt {}/{} in {:?}",
                attempt,
                self.options.max_reconnect_attempts,
                delay
            );
            tokio::time::sleep(delay).await;

            // A manual disconnect during the backoff cancels the attempt
            if self.state.read().await.manual_close {
                return;
            }

            match self.connect().await {
                Ok(()) => {
                    tracing::info!("Reconnected successfully");
                    let on_success =
                        { self.state.read().await.handlers.on_reconnect_success.clone() };
                    if let Some(cb) = on_success {
                        cb();
                    }
                    break;
                }
                Err(e) => {
                    tracing::warn!("Reconnect attempt {} failed: {}", attempt, e);
                }
            }
        }
    }

    /// Marks the transport dead after a close frame or read error, notifies
    /// `on_close`, and lets the watcher decide whether to reconnect.
    async fn handle_transport_closed(&self, code: Option<u16>) {
        self.connection.clear_writer().await;
        self.set_state(ConnectionState::Disconnected).await;

        let on_close = { self.state.read().await.handlers.on_close.clone() };
        if let Some(cb) = on_close {
            cb(code);
        }
    }

    /// Drains the queue head-first; a failed send puts the message back at
    /// the head and stops this pass so ordering is preserved.
    async fn flush_queue(&self) {
        let mut flushed = 0usize;
        loop {
            let message = { self.state.write().await.queue.pop() };
            let Some(message) = message else { break };

            if let Err(e) = self.connection.send_message(&message).await {
                tracing::warn!("Queue flush interrupted ({}), re-queueing head", e);
                self.state.write().await.queue.requeue_front(message);
                break;
            }
            flushed += 1;
        }
        if flushed > 0 {
            tracing::info!("Flushed {} queued message(s)", flushed);
        }
    }

    /// Set connection state and notify the watcher and `on_state_change`.
    async fn set_state(&self, new_state: ConnectionState) {
        self.connection.set_state(new_state).await;

        let on_state_change = {
            let state = self.state.read().await;
            state.notify_state_change(new_state);
            state.handlers.on_state_change.clone()
        };
        if let Some(cb) = on_state_change {
            cb(new_state);
        }
    }

    /// Reports a transport error to the global sink and `on_error`.
    async fn report_error(&self, error: &WsError) {
        let Some(network_error) = NetworkError::from_ws(error) else {
            return;
        };
        report_to_sink(&network_error);

        let on_error = { self.state.read().await.handlers.on_error.clone() };
        if let Some(cb) = on_error {
            cb(&network_error);
        }
    }

    /// Fires `on_reconnect_failed` exactly once per outage.
    async fn report_reconnect_failed(&self) {
        let cb = {
            let mut state = self.state.write().await;
            if state.reconnect_failed_reported {
                None
            } else {
                state.reconnect_failed_reported = true;
                state.handlers.on_reconnect_failed.clone()
            }
        };
        tracing::error!(
            "Giving up after {} reconnect attempts",
            self.options.max_reconnect_attempts
        );
        if let Some(cb) = cb {
            cb();
        }
    }
}
