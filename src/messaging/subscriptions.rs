use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Weak;
use tokio::sync::RwLock;

use super::event::MessageHandler;
use crate::client::ClientState;
use crate::types::WsMessage;

/// Maps message-type strings to registered handlers.
///
/// Delivery for a given inbound message is complete (every current handler
/// runs) but inter-handler order is unspecified. A type's entry is removed
/// when its last handler unsubscribes.
#[derive(Default)]
pub struct SubscriptionTable {
    next_id: u64,
    handlers: HashMap<String, Vec<(u64, MessageHandler)>>,
}

impl SubscriptionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler under the given type, returning its id.
    pub fn insert(&mut self, kind: &str, handler: MessageHandler) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.handlers
            .entry(kind.to_string())
            .or_default()
            .push((id, handler));
        id
    }

    /// Removes the handler with the given id; drops the type's entry when it
    /// becomes empty. Returns whether a handler was removed.
    pub fn remove(&mut self, kind: &str, id: u64) -> bool {
        let Some(entries) = self.handlers.get_mut(kind) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        let removed = entries.len() < before;
        if entries.is_empty() {
            self.handlers.remove(kind);
        }
        removed
    }

    /// Clones the current handlers for a type, for invocation outside the
    /// table's lock.
    pub fn handlers_for(&self, kind: &str) -> Vec<MessageHandler> {
        self.handlers
            .get(kind)
            .map(|entries| entries.iter().map(|(_, h)| h.clone()).collect())
            .unwrap_or_default()
    }

    /// Currently subscribed message types.
    pub fn kinds(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.handlers.contains_key(kind)
    }

    pub fn clear(&mut self) {
        self.handlers.clear();
    }
}

/// Invokes every handler with the message. A panicking handler is caught and
/// logged so it cannot block delivery to the others. Returns the number of
/// handlers invoked.
pub fn invoke_all(handlers: &[MessageHandler], message: &WsMessage) -> usize {
    let mut invoked = 0;
    for handler in handlers {
        invoked += 1;
        if catch_unwind(AssertUnwindSafe(|| handler(message))).is_err() {
            tracing::error!("Subscriber for type '{}' panicked", message.kind);
        }
    }
    invoked
}

/// Guard returned by `subscribe`; call [`unsubscribe`](Self::unsubscribe) to
/// remove exactly the handler it was created for.
pub struct Subscription {
    kind: String,
    id: u64,
    state: Weak<RwLock<ClientState>>,
}

impl Subscription {
    pub(crate) fn new(kind: String, id: u64, state: Weak<RwLock<ClientState>>) -> Self {
        Self { kind, id, state }
    }

    /// The message type this subscription listens for.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Removes this subscription's handler from the table.
    pub async fn unsubscribe(self) {
        if let Some(state) = self.state.upgrade() {
            state.write().await.subscriptions.remove(&self.kind, self.id);
        }
    }
}
