use tokio::task::JoinHandle;

/// Tracks the client's background tasks in single-slot fields.
///
/// A slot is always aborted before being replaced, so a stale read loop or
/// heartbeat timer can never fire into a newer connection's state.
#[derive(Default)]
pub struct TaskManager {
    reader: Option<JoinHandle<()>>,
    heartbeat: Option<JoinHandle<()>>,
}

impl TaskManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the read-loop task, aborting any previous one.
    pub fn set_reader(&mut self, handle: JoinHandle<()>) {
        if let Some(old) = self.reader.replace(handle) {
            old.abort();
        }
    }

    /// Installs the heartbeat task, aborting any previous one.
    pub fn set_heartbeat(&mut self, handle: JoinHandle<()>) {
        if let Some(old) = self.heartbeat.replace(handle) {
            old.abort();
        }
    }

    /// Aborts every tracked task and clears the slots.
    pub fn abort_all(&mut self) {
        if let Some(handle) = self.reader.take() {
            handle.abort();
        }
        if let Some(handle) = self.heartbeat.take() {
            handle.abort();
        }
    }
}

impl Drop for TaskManager {
    fn drop(&mut self) {
        self.abort_all();
    }
}
