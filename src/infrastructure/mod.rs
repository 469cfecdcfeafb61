// Infrastructure module - background services and timing utilities
pub mod backoff;
pub mod heartbeat;
pub mod task_manager;

pub use backoff::Backoff;
pub use heartbeat::HeartbeatManager;
pub use task_manager::TaskManager;
