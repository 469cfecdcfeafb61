// Module declarations
mod builder;
mod connection;
mod core;
mod state;

// Public API exports
pub use builder::{WsClientBuilder, WsClientOptions};
pub use connection::{ConnectionManager, ConnectionState};
pub use self::core::WsClient;
pub use state::{ClientState, ClientStats, StateSignal};
