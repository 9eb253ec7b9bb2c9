//! Start/stop facade for a presentation layer.
//!
//! The presentation layer calls [`TransferManager::start_receiving`] and
//! [`TransferManager::start_sending`] from its own thread; each spawns the
//! role's session on the Tokio runtime and returns immediately. All
//! progress and terminal notifications arrive on the channel returned by
//! [`TransferManager::take_events`], in the order they were produced.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use lanxfer_protocol::{Role, TransferOutcome};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span, warn};

use crate::error::TransferError;
use crate::progress::{ChannelReporter, TransferEvent, report_outcome};
use crate::receiver::Receiver;
use crate::sender::Sender;
use crate::validation::validate_send_input;
use crate::TransferConfig;

/// Runs at most one receiver session and one sender session at a time.
pub struct TransferManager {
    config: TransferConfig,
    events_tx: mpsc::UnboundedSender<TransferEvent>,
    events_rx: Option<mpsc::UnboundedReceiver<TransferEvent>>,
    cancel: CancellationToken,
    receiving: Arc<AtomicBool>,
    sending: Arc<AtomicBool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

/// Marks a role as active until dropped.
struct ActiveGuard(Arc<AtomicBool>);

impl ActiveGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(Arc::clone(flag)))
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl TransferManager {
    pub fn new(config: TransferConfig) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            config,
            events_tx,
            events_rx: Some(events_rx),
            cancel: CancellationToken::new(),
            receiving: Arc::new(AtomicBool::new(false)),
            sending: Arc::new(AtomicBool::new(false)),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<TransferEvent>> {
        self.events_rx.take()
    }

    /// Returns `true` while a session of `role` is running.
    pub fn is_active(&self, role: Role) -> bool {
        self.flag(role).load(Ordering::Acquire)
    }

    /// Starts a receiver session: bind, accept one peer, receive one file.
    ///
    /// Must be called from within a Tokio runtime. Rejected with
    /// [`TransferError::AlreadyActive`] while a receiver session runs.
    pub fn start_receiving(&self) -> Result<(), TransferError> {
        let guard = ActiveGuard::acquire(&self.receiving)
            .ok_or(TransferError::AlreadyActive(Role::Receiver))?;

        let receiver = Receiver::new(self.config.clone(), self.cancel.child_token());
        let reporter = ChannelReporter::new(Role::Receiver, self.events_tx.clone());
        let span = info_span!("transfer", session = %uuid::Uuid::new_v4(), role = %Role::Receiver);

        let handle = tokio::spawn(
            async move {
                let outcome = match receiver.run(&reporter).await {
                    Ok(file) => {
                        info!(peer = %file.peer, path = %file.path.display(), "receive complete");
                        TransferOutcome::Success {
                            filename: file.name,
                            bytes: file.bytes,
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "receive failed");
                        e.into_outcome()
                    }
                };
                drop(guard);
                report_outcome(&reporter, outcome);
            }
            .instrument(span),
        );
        self.track(handle);
        Ok(())
    }

    /// Starts a sender session for `file_path` to `address`.
    ///
    /// Inputs are checked before anything is spawned; a missing address
    /// or file is returned as [`TransferError::MissingInput`] and no
    /// session starts. Must be called from within a Tokio runtime.
    pub fn start_sending(
        &self,
        address: impl Into<String>,
        file_path: impl Into<PathBuf>,
    ) -> Result<(), TransferError> {
        let address = address.into();
        let file_path = file_path.into();
        validate_send_input(&address, &file_path)?;

        let guard = ActiveGuard::acquire(&self.sending)
            .ok_or(TransferError::AlreadyActive(Role::Sender))?;

        let sender = Sender::new(self.config.clone(), self.cancel.child_token());
        let reporter = ChannelReporter::new(Role::Sender, self.events_tx.clone());
        let span = info_span!("transfer", session = %uuid::Uuid::new_v4(), role = %Role::Sender);

        let handle = tokio::spawn(
            async move {
                let outcome = match sender.send(&address, &file_path, &reporter).await {
                    Ok(file) => {
                        info!(peer = %file.peer, "send complete");
                        TransferOutcome::Success {
                            filename: file.name,
                            bytes: file.bytes,
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "send failed");
                        e.into_outcome()
                    }
                };
                drop(guard);
                report_outcome(&reporter, outcome);
            }
            .instrument(span),
        );
        self.track(handle);
        Ok(())
    }

    /// Cancels every running session and waits for them to finish.
    ///
    /// Each cancelled session closes its socket and file, then reports a
    /// `Cancelled` failure. Sessions started after this call are cancelled
    /// immediately.
    pub async fn shutdown(&self) {
        info!("shutting down transfer sessions");
        self.cancel.cancel();

        let handles = {
            let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *tasks)
        };
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "session task ended abnormally");
            }
        }
    }

    fn flag(&self, role: Role) -> &Arc<AtomicBool> {
        match role {
            Role::Receiver => &self.receiving,
            Role::Sender => &self.sending,
        }
    }

    fn track(&self, handle: JoinHandle<()>) {
        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        tasks.retain(|h| !h.is_finished());
        tasks.push(handle);
    }
}
