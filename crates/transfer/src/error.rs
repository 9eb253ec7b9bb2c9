//! Session error types.

use std::net::SocketAddr;

use lanxfer_protocol::{ErrorKind, FrameError, Role, TransferOutcome};

/// Errors that end a transfer session.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("protocol error: {0}")]
    Protocol(#[from] FrameError),

    #[error("connection dropped after {received} of {expected} bytes")]
    ConnectionDropped { received: u64, expected: u64 },

    #[error("connection refused by {0}")]
    ConnectionRefused(String),

    #[error("invalid address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("missing input: {0}")]
    MissingInput(&'static str),

    #[error("connection error: {0}")]
    Connection(#[source] std::io::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cancelled")]
    Cancelled,

    #[error("a {0} session is already active")]
    AlreadyActive(Role),
}

impl TransferError {
    /// Returns the wire-level classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransferError::Bind { .. } => ErrorKind::BindError,
            TransferError::Protocol(_) => ErrorKind::ProtocolError,
            TransferError::ConnectionDropped { .. } => ErrorKind::ConnectionDropped,
            TransferError::ConnectionRefused(_) => ErrorKind::ConnectionRefused,
            TransferError::InvalidAddress { .. } => ErrorKind::InvalidAddress,
            TransferError::FileNotFound(_) => ErrorKind::FileNotFound,
            TransferError::MissingInput(_) => ErrorKind::MissingInput,
            TransferError::Connection(_) => ErrorKind::ConnectionError,
            TransferError::Io(_) => ErrorKind::IoError,
            TransferError::Cancelled => ErrorKind::Cancelled,
            TransferError::AlreadyActive(_) => ErrorKind::AlreadyActive,
        }
    }

    /// Converts the error into a failed terminal outcome.
    pub fn into_outcome(self) -> TransferOutcome {
        TransferOutcome::Failure {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}
