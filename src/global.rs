//! Process-wide shared client instance.
//!
//! Applications that want one physical connection reused across unrelated
//! call sites can initialize it here. All mutable state stays private to the
//! instance; tests should construct isolated [`WsClient`](crate::WsClient)
//! values instead, or call [`reset`] between cases.

use std::sync::{Arc, RwLock};

use crate::client::{WsClient, WsClientOptions};
use crate::types::Result;

static SHARED: RwLock<Option<Arc<WsClient>>> = RwLock::new(None);

/// Builds a client from `options` and installs it as the shared instance,
/// replacing any previous one. Must be called within a tokio runtime.
pub fn init(options: WsClientOptions) -> Result<Arc<WsClient>> {
    let client = Arc::new(WsClient::new(options)?);
    if let Ok(mut guard) = SHARED.write() {
        *guard = Some(Arc::clone(&client));
    }
    Ok(client)
}

/// Returns the shared instance, if one has been initialized.
pub fn get() -> Option<Arc<WsClient>> {
    SHARED.read().ok().and_then(|guard| guard.clone())
}

/// Destroys and removes the shared instance.
pub async fn reset() {
    let client = {
        match SHARED.write() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        }
    };
    if let Some(client) = client {
        client.destroy().await;
    }
}
