use std::sync::Arc;
use std::time::Duration;

use resilient_ws::{EventHandlers, WsClient, WsClientOptions};

/// Watch the reconnection loop in action: run this against a local server,
/// stop the server, then start it again.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let url = std::env::var("WS_URL").unwrap_or_else(|_| "ws://127.0.0.1:4000/ws".to_string());

    let client = WsClient::new(WsClientOptions {
        url,
        reconnect_interval: 1_000,
        max_reconnect_attempts: 5,
        ..Default::default()
    })?;

    let handlers = EventHandlers {
        on_state_change: Some(Arc::new(|state| {
            println!("state -> {:?}", state);
        })),
        on_reconnect_attempt: Some(Arc::new(|attempt| {
            println!("reconnect attempt {}", attempt);
        })),
        on_reconnect_success: Some(Arc::new(|| {
            println!("reconnected");
        })),
        on_reconnect_failed: Some(Arc::new(|| {
            println!("gave up reconnecting");
        })),
        ..Default::default()
    };

    client.connect_with(handlers).await?;
    println!("Connected. Interrupt the server to watch the backoff loop.");

    for _ in 0..60 {
        tokio::time::sleep(Duration::from_secs(1)).await;
        let stats = client.stats().await;
        println!(
            "state={:?} attempts={} queued={}",
            stats.state, stats.reconnect_attempts, stats.queued_messages
        );
    }

    client.destroy().await;
    Ok(())
}
