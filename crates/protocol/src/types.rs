use serde::{Deserialize, Serialize};

/// Which side of a transfer a session runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Receiver,
    Sender,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Receiver => f.write_str("receiver"),
            Role::Sender => f.write_str("sender"),
        }
    }
}

/// Coarse stage of a session, as seen by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Connecting,
    Transferring,
    Done,
    Failed,
}

/// A progress notification emitted while a session runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub phase: Phase,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent: Option<f64>,
}

impl ProgressEvent {
    pub fn connecting(message: impl Into<String>) -> Self {
        Self {
            phase: Phase::Connecting,
            message: message.into(),
            percent: None,
        }
    }

    pub fn transferring(message: impl Into<String>, percent: f64) -> Self {
        Self {
            phase: Phase::Transferring,
            message: message.into(),
            percent: Some(percent),
        }
    }

    pub fn done(message: impl Into<String>) -> Self {
        Self {
            phase: Phase::Done,
            message: message.into(),
            percent: Some(100.0),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            phase: Phase::Failed,
            message: message.into(),
            percent: None,
        }
    }
}

/// Failure classification carried in a terminal notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    BindError,
    ProtocolError,
    ConnectionDropped,
    ConnectionRefused,
    InvalidAddress,
    FileNotFound,
    MissingInput,
    ConnectionError,
    IoError,
    Cancelled,
    AlreadyActive,
}

/// Final result of a session. Delivered exactly once per session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum TransferOutcome {
    Success {
        /// Bare file name, never a path.
        filename: String,
        bytes: u64,
    },
    Failure {
        kind: ErrorKind,
        message: String,
    },
}

impl TransferOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TransferOutcome::Success { .. })
    }
}

/// Returns `done` as a percentage of `total` (0-100).
///
/// An empty transfer is complete by definition and reports 100.
pub fn percent_of(done: u64, total: u64) -> f64 {
    if total == 0 {
        return 100.0;
    }
    (done as f64 / total as f64) * 100.0
}
