//! Remote-control protocol: action messages and queued command payloads.

pub mod command;
pub mod messages;

pub use command::OutboundCommand;
pub use messages::{RemoteAction, DEFAULT_PROTOCOL_VERSION};
