//! Error types for the mqpipe toolkit.
//!
//! Configuration and transport failures are fatal for the device that hits
//! them and surface through its quit queue. Programmer errors (duplicate
//! driver registration, multi-socket channels, unknown socket-type names)
//! are panics, not error values.

use thiserror::Error;

use crate::socket_type::SocketType;

// ----------------------------------------------------------------------------
// Specific Error Types
// ----------------------------------------------------------------------------

/// Failures while resolving the device topology at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no such driver {0:?}")]
    NoSuchDriver(String),

    #[error("no such device {0:?}")]
    NoSuchDevice(String),

    #[error("no such channel (name={name:?} index={index})")]
    NoSuchChannel { name: String, index: usize },

    #[error("invalid socket method (value={0:?})")]
    InvalidMethod(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("could not read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failures raised by a driver socket.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("socket type {0} is not supported by the {1} driver")]
    UnsupportedSocketType(SocketType, &'static str),

    #[error("{typ} socket does not {op}")]
    InvalidOperation { typ: SocketType, op: &'static str },

    #[error("socket setup failed: {0}")]
    Setup(String),

    #[error("bind {addr:?} failed: {reason}")]
    Bind { addr: String, reason: String },

    #[error("dial {addr:?} failed: {reason}")]
    Dial { addr: String, reason: String },

    #[error("send failed: {0}")]
    Send(String),

    #[error("recv failed: {0}")]
    Recv(String),

    #[error("socket is closed")]
    Closed,
}

// ----------------------------------------------------------------------------
// Unified Error Type
// ----------------------------------------------------------------------------

/// The toolkit-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("user logic error: {0}")]
    Logic(String),

    #[error("mailbox closed")]
    MailboxClosed,

    #[error("cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a user-logic error with a message.
    pub fn logic(msg: impl Into<String>) -> Self {
        Error::Logic(msg.into())
    }

    /// True when the cause is cancellation rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
