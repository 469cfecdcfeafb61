use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use url::Url;

use super::{ClientState, ConnectionManager, ConnectionState, StateSignal, WsClient};
use crate::types::constants::{
    DEFAULT_CONNECTION_TIMEOUT, DEFAULT_HEARTBEAT_INTERVAL, DEFAULT_MAX_RECONNECT_ATTEMPTS,
    DEFAULT_RECONNECT_INTERVAL,
};
use crate::types::{Result, WsError};

/// Client configuration. All fields except `url` have working defaults.
#[derive(Debug, Clone)]
pub struct WsClientOptions {
    /// Transport endpoint (`ws://` or `wss://`)
    pub url: String,
    /// WebSocket sub-protocols offered during the handshake
    pub protocols: Vec<String>,
    /// Base backoff unit between reconnect attempts (ms)
    pub reconnect_interval: u64,
    /// Retry ceiling before declaring permanent failure
    pub max_reconnect_attempts: u32,
    /// Heartbeat ping period (ms)
    pub heartbeat_interval: u64,
    /// Connection-establishment deadline (ms)
    pub connection_timeout: u64,
    /// Toggles the heartbeat task
    pub enable_heartbeat: bool,
    /// Toggles per-frame diagnostic logging
    pub enable_logging: bool,
}

impl Default for WsClientOptions {
    fn default() -> Self {
        Self {
            url: String::new(),
            protocols: Vec::new(),
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
            enable_heartbeat: true,
            enable_logging: true,
        }
    }
}

impl WsClientOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

/// Builder for `WsClient` that validates configuration and spawns the
/// reconnection watcher.
pub struct WsClientBuilder {
    options: WsClientOptions,
}

impl WsClientBuilder {
    pub fn new(options: WsClientOptions) -> Result<Self> {
        if options.url.is_empty() {
            return Err(WsError::Config("endpoint URL is required".to_string()));
        }

        let parsed = Url::parse(&options.url)?;
        match parsed.scheme() {
            "ws" | "wss" => {}
            other => {
                return Err(WsError::Config(format!(
                    "unsupported URL scheme '{}', expected ws or wss",
                    other
                )));
            }
        }

        Ok(Self { options })
    }

    /// Builds the client and spawns its reconnection watcher task.
    ///
    /// Must be called within a tokio runtime.
    pub fn build(self) -> WsClient {
        let mut client_state = ClientState::new();

        let (state_tx, state_rx) = watch::channel(StateSignal {
            state: ConnectionState::Disconnected,
            manual_close: false,
            offline: false,
        });
        client_state.state_change_tx = Some(state_tx);

        let client = WsClient::from_parts(
            self.options,
            Arc::new(ConnectionManager::new()),
            Arc::new(RwLock::new(client_state)),
        );

        // Reconnection watcher: reacts to unexpected disconnects. Manual
        // closes and offline periods are excluded by their flags.
        let client_for_watcher = client.clone();
        tokio::spawn(async move {
            let mut rx = state_rx;

            while rx.changed().await.is_ok() {
                let signal = *rx.borrow_and_update();

                if signal.state == ConnectionState::Disconnected
                    && !signal.manual_close
                    && !signal.offline
                {
                    tracing::info!("Watcher detected disconnect, attempting reconnection");
                    client_for_watcher.try_reconnect().await;
                }
            }
            tracing::debug!("Reconnection watcher task finished");
        });

        client
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let options = WsClientOptions::default();
        assert_eq!(options.reconnect_interval, 3_000);
        assert_eq!(options.max_reconnect_attempts, 10);
        assert_eq!(options.heartbeat_interval, 30_000);
        assert_eq!(options.connection_timeout, 10_000);
        assert!(options.enable_heartbeat);
        assert!(options.enable_logging);
        assert!(options.protocols.is_empty());
    }

    #[test]
    fn test_empty_url_is_rejected() {
        let result = WsClientBuilder::new(WsClientOptions::default());
        assert!(matches!(result, Err(WsError::Config(_))));
    }

    #[test]
    fn test_non_websocket_scheme_is_rejected() {
        let result = WsClientBuilder::new(WsClientOptions::new("http://example.com/socket"));
        assert!(matches!(result, Err(WsError::Config(_))));
    }

    #[test]
    fn test_malformed_url_is_rejected() {
        let result = WsClientBuilder::new(WsClientOptions::new("not a url"));
        assert!(matches!(result, Err(WsError::UrlParse(_))));
    }

    #[test]
    fn test_ws_and_wss_schemes_are_accepted() {
        assert!(WsClientBuilder::new(WsClientOptions::new("ws://localhost:4000/ws")).is_ok());
        assert!(WsClientBuilder::new(WsClientOptions::new("wss://example.com/ws")).is_ok());
    }

    #[tokio::test]
    async fn test_destroy_closes_the_state_channel_so_the_watcher_exits() {
        let client = WsClient::new(WsClientOptions::new("ws://127.0.0.1:9/ws")).unwrap();

        let mut rx = {
            let state = client.state.read().await;
            state.state_change_tx.as_ref().unwrap().subscribe()
        };

        client.destroy().await;
        assert!(client.state.read().await.state_change_tx.is_none());

        // The sender is gone: after draining any pending signals the channel
        // reports closure, which is what makes the watcher loop terminate.
        while rx.changed().await.is_ok() {}
    }
}
