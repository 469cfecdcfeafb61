//! # resilient-ws
//!
//! A resilient WebSocket client: one logical connection with automatic
//! reconnection (exponential backoff), heartbeat liveness bookkeeping,
//! bounded outbound queueing while disconnected, and type-keyed
//! publish/subscribe fan-out for inbound messages.
//!
//! ## Example
//!
//! ```no_run
//! use resilient_ws::{WsClient, WsClientOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = WsClient::new(WsClientOptions {
//!         url: "wss://example.com/ws".to_string(),
//!         ..Default::default()
//!     })?;
//!
//!     client.connect().await?;
//!
//!     let _sub = client
//!         .subscribe("notification", |msg| {
//!             println!("notification: {}", msg.data);
//!         })
//!         .await;
//!
//!     client.send("chat", serde_json::json!({ "msg": "hi" })).await;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod global;
pub mod infrastructure;
pub mod messaging;
pub mod types;
pub mod websocket;

pub use client::{ClientStats, ConnectionState, WsClient, WsClientBuilder, WsClientOptions};
pub use messaging::{
    EnvironmentEvent, EventHandlers, MessageQueue, SendStatus, Subscription,
};
pub use types::{
    clear_error_sink, set_error_sink, NetworkError, NetworkErrorCode, Result, WsError, WsMessage,
};
