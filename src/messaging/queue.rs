use std::collections::VecDeque;

use crate::types::constants::MAX_QUEUE_SIZE;
use crate::types::WsMessage;

/// Bounded FIFO buffer for outbound messages awaiting transmission.
///
/// Pushing beyond capacity evicts the oldest entry. Draining pops from the
/// head; a message whose send fails mid-flush must be put back at the head
/// via [`requeue_front`](Self::requeue_front) so the remaining order is
/// preserved.
pub struct MessageQueue {
    items: VecDeque<WsMessage>,
    capacity: usize,
}

impl MessageQueue {
    pub fn new() -> Self {
        Self::with_capacity(MAX_QUEUE_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: VecDeque::new(),
            capacity,
        }
    }

    /// Appends a message, evicting the oldest entry when full.
    /// Returns the evicted message, if any.
    pub fn push(&mut self, message: WsMessage) -> Option<WsMessage> {
        let evicted = if self.items.len() >= self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(message);
        evicted
    }

    /// Removes and returns the head of the queue.
    pub fn pop(&mut self) -> Option<WsMessage> {
        self.items.pop_front()
    }

    /// Re-inserts a message at the head after a failed send.
    pub fn requeue_front(&mut self, message: WsMessage) {
        self.items.push_front(message);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl Default for MessageQueue {
    fn default() -> Self {
        Self::new()
    }
}
