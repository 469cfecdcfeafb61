pub mod constants;
pub mod error;
pub mod message;

pub use constants::*;
pub use error::{
    clear_error_sink, set_error_sink, ErrorSink, NetworkError, NetworkErrorCode, Result, WsError,
};
pub use message::{now_millis, WsMessage};
