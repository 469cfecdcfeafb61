//! Integration tests against a loopback WebSocket server.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

use resilient_ws::{
    ConnectionState, EnvironmentEvent, EventHandlers, SendStatus, WsClient, WsClientOptions,
    WsError, WsMessage,
};

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    (listener, url)
}

fn quiet_options(url: &str) -> WsClientOptions {
    WsClientOptions {
        url: url.to_string(),
        reconnect_interval: 10,
        enable_heartbeat: false,
        enable_logging: false,
        ..Default::default()
    }
}

/// Accepts connections, counts them, and drains inbound frames.
fn idle_server(listener: TcpListener) -> Arc<AtomicUsize> {
    let accepts = Arc::new(AtomicUsize::new(0));
    let accepts_clone = Arc::clone(&accepts);
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            accepts_clone.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                let mut ws = accept_async(stream).await.unwrap();
                while let Some(Ok(_)) = ws.next().await {}
            });
        }
    });
    accepts
}

/// Accepts connections and forwards every inbound text frame to the
/// returned channel. Replies to `ping` messages with a `pong`.
fn collector_server(listener: TcpListener) -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let tx = tx.clone();
            tokio::spawn(async move {
                let mut ws = accept_async(stream).await.unwrap();
                while let Some(Ok(msg)) = ws.next().await {
                    if let Message::Text(text) = msg {
                        let is_ping = serde_json::from_str::<serde_json::Value>(text.as_str())
                            .map(|v| v["type"] == "ping")
                            .unwrap_or(false);
                        let _ = tx.send(text.to_string());
                        if is_ping {
                            let pong = r#"{"type":"pong","data":{},"timestamp":1}"#.to_string();
                            let _ = ws.send(Message::Text(pong.into())).await;
                        }
                    }
                }
            });
        }
    });
    rx
}

/// Accepts connections and immediately pushes the given frame to each.
fn push_server(listener: TcpListener, frame: &str) {
    let frame = frame.to_string();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let frame = frame.clone();
            tokio::spawn(async move {
                let mut ws = accept_async(stream).await.unwrap();
                ws.send(Message::Text(frame.into())).await.unwrap();
                while let Some(Ok(_)) = ws.next().await {}
            });
        }
    });
}

/// Accepts the TCP connection but stalls before the WebSocket handshake,
/// keeping the client in `Connecting` for the given duration.
fn slow_handshake_server(listener: TcpListener, delay: Duration) {
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::time::sleep(delay).await;
            tokio::spawn(async move {
                if let Ok(mut ws) = accept_async(stream).await {
                    while let Some(Ok(_)) = ws.next().await {}
                }
            });
        }
    });
}

async fn wait_for_connected(client: &WsClient, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if client.is_connected().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[tokio::test]
async fn cold_connect_reaches_connected_state() {
    let (listener, url) = bind().await;
    idle_server(listener);

    let client = WsClient::new(quiet_options(&url)).unwrap();
    client.connect().await.unwrap();

    assert!(client.is_connected().await);
    let stats = client.stats().await;
    assert_eq!(stats.state, ConnectionState::Connected);
    assert_eq!(stats.reconnect_attempts, 0);
    assert_eq!(stats.queued_messages, 0);

    client.destroy().await;
}

#[tokio::test]
async fn connect_is_idempotent() {
    let (listener, url) = bind().await;
    let accepts = idle_server(listener);

    let client = WsClient::new(quiet_options(&url)).unwrap();
    client.connect().await.unwrap();
    client.connect().await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(accepts.load(Ordering::SeqCst), 1);
    client.destroy().await;
}

#[tokio::test]
async fn send_while_disconnected_queues_then_flushes_in_order() {
    let (listener, url) = bind().await;
    let mut frames = collector_server(listener);

    let client = WsClient::new(quiet_options(&url)).unwrap();

    assert_eq!(
        client.send("chat", json!({ "msg": "hi" })).await,
        SendStatus::Queued
    );
    assert_eq!(
        client.send("chat", json!({ "msg": "again" })).await,
        SendStatus::Queued
    );
    assert_eq!(client.stats().await.queued_messages, 2);

    client.connect().await.unwrap();
    assert_eq!(client.stats().await.queued_messages, 0);

    let first = tokio::time::timeout(Duration::from_secs(5), frames.recv())
        .await
        .unwrap()
        .unwrap();
    let first: serde_json::Value = serde_json::from_str(&first).unwrap();
    assert_eq!(first["type"], "chat");
    assert_eq!(first["data"]["msg"], "hi");

    let second = tokio::time::timeout(Duration::from_secs(5), frames.recv())
        .await
        .unwrap()
        .unwrap();
    let second: serde_json::Value = serde_json::from_str(&second).unwrap();
    assert_eq!(second["data"]["msg"], "again");

    // With the transport open, sends no longer queue
    assert_eq!(
        client.send("chat", json!({ "msg": "live" })).await,
        SendStatus::Sent
    );

    client.destroy().await;
}

#[tokio::test]
async fn malformed_inbound_frame_falls_back_to_raw_message() {
    let (listener, url) = bind().await;
    push_server(listener, "hello");

    let client = WsClient::new(quiet_options(&url)).unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();

    let handlers = EventHandlers {
        on_message: Some(Arc::new(move |msg: &WsMessage| {
            let _ = tx.send(msg.clone());
        })),
        ..Default::default()
    };
    client.connect_with(handlers).await.unwrap();

    let message = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(message.kind, "message");
    assert_eq!(message.data, serde_json::Value::String("hello".to_string()));
    assert!(message.timestamp > 0);

    client.destroy().await;
}

#[tokio::test]
async fn fan_out_reaches_all_subscribers_even_if_one_panics() {
    let (listener, url) = bind().await;
    push_server(
        listener,
        r#"{"type":"notification","data":{"title":"x"},"timestamp":1}"#,
    );

    let client = WsClient::new(quiet_options(&url)).unwrap();

    let survivor = Arc::new(AtomicUsize::new(0));
    let survivor_clone = Arc::clone(&survivor);

    let _panicking = client
        .subscribe("notification", |_msg| panic!("subscriber failure"))
        .await;
    let _counting = client
        .subscribe("notification", move |_msg| {
            survivor_clone.fetch_add(1, Ordering::SeqCst);
        })
        .await;

    client.connect().await.unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while survivor.load(Ordering::SeqCst) == 0 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(survivor.load(Ordering::SeqCst), 1);

    client.destroy().await;
}

#[tokio::test]
async fn reconnect_ceiling_fires_failed_callback_once() {
    let (listener, url) = bind().await;

    // Accept one connection, close it from the server side, then drop the
    // listener so every reconnect attempt is refused.
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        drop(listener);
        let mut ws = accept_async(stream).await.unwrap();
        let _ = ws.close(None).await;
    });

    let attempts = Arc::new(AtomicU32::new(0));
    let failures = Arc::new(AtomicU32::new(0));
    let attempts_clone = Arc::clone(&attempts);
    let failures_clone = Arc::clone(&failures);

    let client = WsClient::new(WsClientOptions {
        max_reconnect_attempts: 2,
        ..quiet_options(&url)
    })
    .unwrap();

    let handlers = EventHandlers {
        on_reconnect_attempt: Some(Arc::new(move |_n| {
            attempts_clone.fetch_add(1, Ordering::SeqCst);
        })),
        on_reconnect_failed: Some(Arc::new(move || {
            failures_clone.fetch_add(1, Ordering::SeqCst);
        })),
        ..Default::default()
    };
    client.connect_with(handlers).await.unwrap();

    tokio::time::sleep(Duration::from_millis(800)).await;

    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert_eq!(failures.load(Ordering::SeqCst), 1);
    assert!(!client.is_connected().await);
    assert_eq!(client.stats().await.reconnect_attempts, 2);

    // No further attempts after the ceiling
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(attempts.load(Ordering::SeqCst), 2);

    client.destroy().await;
}

#[tokio::test]
async fn manual_disconnect_suppresses_reconnection() {
    let (listener, url) = bind().await;
    let accepts = idle_server(listener);

    let closes = Arc::new(AtomicU32::new(0));
    let closes_clone = Arc::clone(&closes);

    let client = WsClient::new(quiet_options(&url)).unwrap();
    let handlers = EventHandlers {
        on_close: Some(Arc::new(move |code| {
            assert_eq!(code, Some(1000));
            closes_clone.fetch_add(1, Ordering::SeqCst);
        })),
        ..Default::default()
    };
    client.connect_with(handlers).await.unwrap();

    client.disconnect().await.unwrap();
    assert_eq!(client.state().await, ConnectionState::Closed);
    assert_eq!(closes.load(Ordering::SeqCst), 1);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(accepts.load(Ordering::SeqCst), 1);
    assert!(!client.is_connected().await);

    client.destroy().await;
}

#[tokio::test]
async fn disconnect_during_handshake_cancels_the_connect() {
    let (listener, url) = bind().await;
    slow_handshake_server(listener, Duration::from_millis(300));

    let client = WsClient::new(WsClientOptions {
        connection_timeout: 5_000,
        ..quiet_options(&url)
    })
    .unwrap();

    let connector = client.clone();
    let connect_task = tokio::spawn(async move { connector.connect().await });

    // Let the handshake get in flight, then cancel it.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(client.state().await, ConnectionState::Connecting);
    client.disconnect().await.unwrap();

    let result = connect_task.await.unwrap();
    assert!(
        matches!(result, Err(WsError::Cancelled)),
        "cancelled connect must not report success: {:?}",
        result
    );

    // The manual close stands even after the handshake completes.
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(client.state().await, ConnectionState::Closed);
    assert!(!client.is_connected().await);

    client.destroy().await;
}

#[tokio::test]
async fn heartbeat_pong_updates_liveness_timestamp() {
    let (listener, url) = bind().await;
    let _frames = collector_server(listener);

    let client = WsClient::new(WsClientOptions {
        enable_heartbeat: true,
        heartbeat_interval: 50,
        ..quiet_options(&url)
    })
    .unwrap();
    client.connect().await.unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if client.stats().await.last_heartbeat.is_some() {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "no pong recorded before deadline"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    client.destroy().await;
}

#[tokio::test]
async fn unsubscribe_stops_delivery_and_clears_the_type() {
    let (listener, url) = bind().await;
    push_server(
        listener,
        r#"{"type":"notification","data":null,"timestamp":1}"#,
    );

    let client = WsClient::new(quiet_options(&url)).unwrap();
    let deliveries = Arc::new(AtomicUsize::new(0));
    let deliveries_clone = Arc::clone(&deliveries);

    let subscription = client
        .subscribe("notification", move |_msg| {
            deliveries_clone.fetch_add(1, Ordering::SeqCst);
        })
        .await;
    assert_eq!(client.stats().await.subscribed_types, vec!["notification"]);

    subscription.unsubscribe().await;
    assert!(client.stats().await.subscribed_types.is_empty());

    client.connect().await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(deliveries.load(Ordering::SeqCst), 0);

    client.destroy().await;
}

#[tokio::test]
async fn destroyed_client_refuses_to_connect() {
    let (listener, url) = bind().await;
    idle_server(listener);

    let client = WsClient::new(quiet_options(&url)).unwrap();
    client.destroy().await;

    assert!(matches!(client.connect().await, Err(WsError::Destroyed)));
}

#[tokio::test]
async fn offline_defers_reconnection_until_online() {
    let (listener, url) = bind().await;
    idle_server(listener);

    let attempts = Arc::new(AtomicU32::new(0));
    let attempts_clone = Arc::clone(&attempts);

    let client = WsClient::new(quiet_options(&url)).unwrap();
    let handlers = EventHandlers {
        on_reconnect_attempt: Some(Arc::new(move |_n| {
            attempts_clone.fetch_add(1, Ordering::SeqCst);
        })),
        ..Default::default()
    };
    client.connect_with(handlers).await.unwrap();

    client.handle_environment(EnvironmentEvent::Offline).await;
    assert_eq!(client.state().await, ConnectionState::Disconnected);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(attempts.load(Ordering::SeqCst), 0, "reconnected while offline");

    client.handle_environment(EnvironmentEvent::Online).await;
    assert!(wait_for_connected(&client, Duration::from_secs(5)).await);

    client.destroy().await;
}

#[tokio::test]
async fn connection_to_unreachable_endpoint_fails_without_retry() {
    // Bind then drop so the port is closed
    let (listener, url) = bind().await;
    drop(listener);

    let attempts = Arc::new(AtomicU32::new(0));
    let attempts_clone = Arc::clone(&attempts);

    let client = WsClient::new(quiet_options(&url)).unwrap();
    let handlers = EventHandlers {
        on_reconnect_attempt: Some(Arc::new(move |_n| {
            attempts_clone.fetch_add(1, Ordering::SeqCst);
        })),
        ..Default::default()
    };

    assert!(client.connect_with(handlers).await.is_err());
    assert_eq!(client.state().await, ConnectionState::Error);

    // A failed initial connect is not an unexpected close: no auto-retry
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(attempts.load(Ordering::SeqCst), 0);

    client.destroy().await;
}
