use std::time::Duration;

use resilient_ws::{WsClient, WsClientOptions};

/// Basic usage: connect, subscribe, send, inspect stats.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "resilient_ws=debug".into()),
        )
        .init();

    let url = std::env::var("WS_URL").unwrap_or_else(|_| "ws://127.0.0.1:4000/ws".to_string());
    println!("Connecting to: {}", url);

    let client = WsClient::new(WsClientOptions::new(&url))?;

    let _notifications = client
        .subscribe("notification", |msg| {
            println!("notification: {}", msg.data);
        })
        .await;

    client.connect().await?;
    println!("Connected: {}", client.is_connected().await);

    client
        .send("chat", serde_json::json!({ "msg": "hello from resilient-ws" }))
        .await;

    tokio::time::sleep(Duration::from_secs(5)).await;

    let stats = client.stats().await;
    println!(
        "state={:?} queued={} subscriptions={:?}",
        stats.state, stats.queued_messages, stats.subscribed_types
    );

    client.disconnect().await?;
    Ok(())
}
