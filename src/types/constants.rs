/// Reserved message type strings (magic strings layer)
pub mod reserved_types {
    /// Client-to-server heartbeat probe.
    pub const PING: &str = "ping";
    /// Server-to-client heartbeat acknowledgment.
    pub const PONG: &str = "pong";
    /// Fallback type synthesized for frames that fail JSON decoding.
    pub const RAW_MESSAGE: &str = "message";
}

/// Default base backoff unit between reconnect attempts (milliseconds)
pub const DEFAULT_RECONNECT_INTERVAL: u64 = 3_000;

/// Ceiling on automatic reconnect attempts
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 10;

/// Upper bound on a single backoff delay (milliseconds)
pub const MAX_BACKOFF_DELAY: u64 = 30_000;

/// Default heartbeat ping period (milliseconds)
pub const DEFAULT_HEARTBEAT_INTERVAL: u64 = 30_000;

/// Default connection-establishment deadline (milliseconds)
pub const DEFAULT_CONNECTION_TIMEOUT: u64 = 10_000;

/// Max outbound messages buffered while the transport is down
pub const MAX_QUEUE_SIZE: usize = 100;
