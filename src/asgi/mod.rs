//! Connection-level entrypoint: protocol messages in, protocol messages out.

mod emitter;
mod entrypoint;

pub use emitter::emit;
pub use entrypoint::{AsgiHandler, ConnectionHandler};
