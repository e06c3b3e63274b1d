//! Wire-level protocol support: stream reassembly, command codec, and
//! outbound message construction.

pub mod commands;
pub mod decoder;
pub mod outbound;
pub mod tags;

pub use commands::InboundMessage;
pub use decoder::{DEFAULT_MAX_PAYLOAD, Frame, StreamDecoder, SyncMode};
pub use outbound::OutboundMessage;
pub use tags::CommandTag;
