use lanxfer_protocol::{ProgressEvent, Role, TransferOutcome, percent_of};
use serde::Serialize;
use tokio::sync::mpsc;

/// Receives notifications from a running session.
///
/// Implementations must not block: they are called from the session's
/// task between socket reads and writes.
pub trait Reporter: Send + Sync {
    /// Called zero or more times per session.
    fn on_progress(&self, event: ProgressEvent);

    /// Called exactly once per session, after its socket and file are closed.
    fn on_terminal(&self, outcome: TransferOutcome);
}

/// A notification tagged with the role of the session that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransferEvent {
    Progress { role: Role, event: ProgressEvent },
    Terminal { role: Role, outcome: TransferOutcome },
}

impl TransferEvent {
    pub fn role(&self) -> Role {
        match self {
            TransferEvent::Progress { role, .. } | TransferEvent::Terminal { role, .. } => *role,
        }
    }
}

/// [`Reporter`] that forwards notifications into an unbounded channel.
///
/// Sends never wait and never fail the session; if the receiving side
/// is gone the notification is dropped.
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    role: Role,
    tx: mpsc::UnboundedSender<TransferEvent>,
}

impl ChannelReporter {
    pub fn new(role: Role, tx: mpsc::UnboundedSender<TransferEvent>) -> Self {
        Self { role, tx }
    }
}

impl Reporter for ChannelReporter {
    fn on_progress(&self, event: ProgressEvent) {
        let _ = self.tx.send(TransferEvent::Progress {
            role: self.role,
            event,
        });
    }

    fn on_terminal(&self, outcome: TransferOutcome) {
        let _ = self.tx.send(TransferEvent::Terminal {
            role: self.role,
            outcome,
        });
    }
}

/// Reports a session's terminal outcome, preceded by a `Failed` progress
/// event when the session did not succeed.
pub(crate) fn report_outcome(reporter: &dyn Reporter, outcome: TransferOutcome) {
    if let TransferOutcome::Failure { message, .. } = &outcome {
        reporter.on_progress(ProgressEvent::failed(message.clone()));
    }
    reporter.on_terminal(outcome);
}

/// Byte accounting for one session's body.
#[derive(Debug, Clone)]
pub struct ProgressMeter {
    total: u64,
    transferred: u64,
}

impl ProgressMeter {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            transferred: 0,
        }
    }

    /// Records `bytes` more transferred and returns the new percentage.
    pub fn advance(&mut self, bytes: u64) -> f64 {
        self.transferred = self.transferred.saturating_add(bytes);
        self.percent()
    }

    pub fn percent(&self) -> f64 {
        percent_of(self.transferred.min(self.total), self.total)
    }

    pub fn transferred(&self) -> u64 {
        self.transferred
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Bytes still expected before the declared size is reached.
    pub fn remaining(&self) -> u64 {
        self.total.saturating_sub(self.transferred)
    }

    pub fn is_complete(&self) -> bool {
        self.transferred >= self.total
    }
}

/// [`ProgressMeter::remaining`] as a buffer length, saturating on targets
/// where `usize` is narrower than `u64`.
pub(crate) fn remaining_usize(meter: &ProgressMeter) -> usize {
    usize::try_from(meter.remaining()).unwrap_or(usize::MAX)
}
