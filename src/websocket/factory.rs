use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::types::{Result, WsError};

/// The transport stream type wrapped by the client.
pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Creates WebSocket connections with a handshake deadline.
pub struct WebSocketFactory;

impl WebSocketFactory {
    /// Opens a connection to `url`, offering the given sub-protocols.
    ///
    /// Fails with [`WsError::ConnectionTimeout`] if the handshake does not
    /// complete within `timeout`, and [`WsError::ConnectionFailed`] if the
    /// handshake request itself cannot be constructed.
    pub async fn create(url: &str, protocols: &[String], timeout: Duration) -> Result<WsStream> {
        let mut request = url
            .into_client_request()
            .map_err(|e| WsError::ConnectionFailed(e.to_string()))?;

        if !protocols.is_empty() {
            let joined = protocols.join(", ");
            let value = HeaderValue::from_str(&joined)
                .map_err(|e| WsError::ConnectionFailed(e.to_string()))?;
            request
                .headers_mut()
                .insert("Sec-WebSocket-Protocol", value);
        }

        tracing::debug!("Opening WebSocket connection to {}", url);

        match tokio::time::timeout(timeout, connect_async(request)).await {
            Err(_) => Err(WsError::ConnectionTimeout),
            Ok(Err(e)) => Err(WsError::WebSocket(e)),
            Ok(Ok((stream, _response))) => Ok(stream),
        }
    }
}
