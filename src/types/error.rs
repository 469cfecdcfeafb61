use serde::Serialize;
use std::sync::{Arc, RwLock};
use thiserror::Error;

use super::message::now_millis;

/// Errors that can occur when using the resilient WebSocket client.
#[derive(Error, Debug)]
pub enum WsError {
    /// WebSocket protocol error (handshake failed, invalid frame, I/O error)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The connection did not open before the configured deadline
    #[error("connection attempt timed out")]
    ConnectionTimeout,

    /// Failure while constructing the transport (bad request, TLS setup, etc.)
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// A concurrent `disconnect()` cancelled the connection attempt
    #[error("connection attempt cancelled")]
    Cancelled,

    /// URL parsing error (malformed endpoint URL)
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// JSON serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Attempted transmission while the transport is not open
    #[error("not connected")]
    NotConnected,

    /// The client was destroyed and cannot be reused
    #[error("client has been destroyed")]
    Destroyed,

    /// Invalid client configuration
    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience type alias for `Result<T, WsError>`.
pub type Result<T> = std::result::Result<T, WsError>;

/// Classification codes for errors surfaced to the error sink and `on_error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NetworkErrorCode {
    ConnectionTimeout,
    WebsocketError,
    ConnectionFailed,
}

/// Uniform error value reported for transport-level failures.
///
/// All variants are retryable: the reconnection loop decides independently
/// whether to retry based on transport close/error events, not on this
/// classification.
#[derive(Debug, Clone, Serialize)]
pub struct NetworkError {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub code: NetworkErrorCode,
    pub message: String,
    pub retryable: bool,
    pub timestamp: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

impl NetworkError {
    pub fn new(code: NetworkErrorCode, message: impl Into<String>) -> Self {
        Self {
            kind: "network",
            code,
            message: message.into(),
            retryable: true,
            timestamp: now_millis(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = Some(context);
        self
    }

    /// Maps a transport-level `WsError` into the reportable taxonomy.
    ///
    /// Errors outside the taxonomy (serialization, configuration, ...) are
    /// not elevated to the sink and return `None`.
    pub fn from_ws(err: &WsError) -> Option<Self> {
        let code = match err {
            WsError::ConnectionTimeout => NetworkErrorCode::ConnectionTimeout,
            WsError::WebSocket(_) => NetworkErrorCode::WebsocketError,
            WsError::ConnectionFailed(_) => NetworkErrorCode::ConnectionFailed,
            _ => return None,
        };
        Some(Self::new(code, err.to_string()))
    }
}

/// Callback receiving every reportable transport error, for cross-cutting
/// observability.
pub type ErrorSink = Arc<dyn Fn(&NetworkError) + Send + Sync>;

static ERROR_SINK: RwLock<Option<ErrorSink>> = RwLock::new(None);

/// Registers a process-wide error sink. Replaces any previous sink.
pub fn set_error_sink(sink: ErrorSink) {
    if let Ok(mut guard) = ERROR_SINK.write() {
        *guard = Some(sink);
    }
}

/// Removes the process-wide error sink.
pub fn clear_error_sink() {
    if let Ok(mut guard) = ERROR_SINK.write() {
        *guard = None;
    }
}

/// Reports an error to the registered sink, if any.
pub(crate) fn report_to_sink(error: &NetworkError) {
    let sink = match ERROR_SINK.read() {
        Ok(guard) => guard.clone(),
        Err(_) => None,
    };
    if let Some(sink) = sink {
        sink(error);
    }
}
