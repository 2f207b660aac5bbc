//! Network infrastructure: outbound remote-control connections.
//!
//! # Sub-modules
//!
//! - **`command_worker`** – One background thread per network-controlled
//!   target.  Owns a FIFO queue of outbound commands and a persistent
//!   connection; connects lazily, authenticates, reconnects after failures,
//!   and shuts down without sending anything past the shutdown sentinel.
//!
//! - **`websocket`** – The production transport: a WebSocket client
//!   (tokio-tungstenite) driven by a single-threaded Tokio runtime that the
//!   worker thread owns.
//!
//! - **`mock`** – A recording transport for tests.
//!
//! The worker only sees the [`Connector`] / [`Connection`] seam, so the
//! delivery rules are testable without a socket.

use thiserror::Error;

use clicker_core::protocol::DEFAULT_PROTOCOL_VERSION;

pub mod command_worker;
pub mod mock;
pub mod websocket;

/// Error type for transport operations.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to connect to {endpoint}: {reason}")]
    ConnectFailed { endpoint: String, reason: String },
    #[error("send failed: {0}")]
    SendFailed(String),
    #[error("connection closed")]
    Closed,
    #[error("transport runtime unavailable: {0}")]
    Runtime(String),
}

/// Credentials sent in the authentication message right after connecting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub protocol: String,
    pub password: String,
}

impl Credentials {
    /// Credentials for the default protocol version.
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            protocol: DEFAULT_PROTOCOL_VERSION.to_string(),
            password: password.into(),
        }
    }
}

/// One open connection to a remote-control endpoint.
pub trait Connection: Send {
    /// Non-blocking liveness check.  Drains pending inbound frames; a close
    /// frame, end of stream, or read error means the connection is dead.
    fn is_alive(&mut self) -> bool;

    /// Sends one text frame.
    fn send_text(&mut self, payload: &str) -> Result<(), TransportError>;

    /// Closes the connection.  Errors are ignored.
    fn close(&mut self);
}

/// Opens connections to one configured endpoint.
pub trait Connector: Send {
    /// Opens a fresh connection.
    fn connect(&mut self) -> Result<Box<dyn Connection>, TransportError>;

    /// The endpoint this connector targets, for logs.
    fn endpoint(&self) -> &str;
}
