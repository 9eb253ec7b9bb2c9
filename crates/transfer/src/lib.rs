//! Single-file transfer over a direct TCP connection.
//!
//! One side runs a [`Receiver`] that accepts exactly one connection and
//! streams the declared number of bytes to disk; the other runs a
//! [`Sender`] that connects, writes the header frame and streams the
//! file. [`TransferManager`] wraps both behind start triggers for a
//! presentation layer and delivers notifications over a channel.

mod error;
mod manager;
mod progress;
mod receiver;
mod sender;
mod validation;

use std::future::Future;
use std::path::PathBuf;

use tokio_util::sync::CancellationToken;

pub use error::TransferError;
pub use manager::TransferManager;
pub use progress::{ChannelReporter, ProgressMeter, Reporter, TransferEvent};
pub use receiver::{ReceivedFile, Receiver};
pub use sender::{SentFile, Sender};
pub use validation::{destination_path, validate_send_input};

pub use lanxfer_protocol::{ErrorKind, Phase, ProgressEvent, Role, TransferOutcome};

/// Listen backlog for the receiver socket. Only one peer is ever accepted.
pub const LISTEN_BACKLOG: u32 = 1;

/// Settings shared by both roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferConfig {
    /// Port the receiver binds and the sender connects to.
    pub port: u16,
    /// Directory received files are written into.
    pub download_dir: PathBuf,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            port: lanxfer_protocol::PORT,
            download_dir: PathBuf::from("."),
        }
    }
}

/// Races `fut` against `cancel`, preferring cancellation.
pub(crate) async fn cancellable<F: Future>(
    cancel: &CancellationToken,
    fut: F,
) -> Result<F::Output, TransferError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(TransferError::Cancelled),
        out = fut => Ok(out),
    }
}
