pub mod types;
pub mod wire;

pub use types::{ClientMessage, GameOverReason, ServerMessage, WireBoard, WireCell};
pub use wire::{
    FramedMessage, WireConfig, WireProtocolError, DEFAULT_MAX_MESSAGE_SIZE, DEFAULT_WRITE_TIMEOUT,
    LENGTH_PREFIX_SIZE, MIN_MESSAGE_SIZE,
};
