//! Listener role.
//!
//! Binds the configured port, accepts a single connection, parses the
//! header frame from one read, then streams the declared number of bytes
//! into a file named after the header's (sanitized) name.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use lanxfer_protocol::{BUFFER_SIZE, ProgressEvent, TransferMetadata};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::TransferError;
use crate::progress::{ProgressMeter, Reporter, remaining_usize};
use crate::validation::destination_path;
use crate::{LISTEN_BACKLOG, TransferConfig, cancellable};

/// A file that was fully received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedFile {
    /// Sanitized file name (no directory components).
    pub name: String,
    /// Where the file was written.
    pub path: PathBuf,
    pub bytes: u64,
    pub peer: SocketAddr,
}

/// Receiving side of a transfer.
pub struct Receiver {
    config: TransferConfig,
    cancel: CancellationToken,
}

impl Receiver {
    pub fn new(config: TransferConfig, cancel: CancellationToken) -> Self {
        Self { config, cancel }
    }

    /// Binds `0.0.0.0:<port>` with a backlog of one.
    ///
    /// Fails with [`TransferError::Bind`] if another socket already holds
    /// the port.
    ///
    /// The caller passes the listener to
    /// [`accept_and_receive`](Self::accept_and_receive), which consumes it.
    pub fn listen(&self) -> Result<TcpListener, TransferError> {
        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.config.port));
        let bind_err = |source| TransferError::Bind { addr, source };

        let socket = TcpSocket::new_v4().map_err(bind_err)?;
        // Winsock lets SO_REUSEADDR bind over a live listener.
        #[cfg(unix)]
        socket.set_reuseaddr(true).map_err(bind_err)?;
        socket.bind(addr).map_err(bind_err)?;
        let listener = socket.listen(LISTEN_BACKLOG).map_err(bind_err)?;

        let port = listener.local_addr().map_err(bind_err)?.port();
        info!(port, "receiver listening");
        Ok(listener)
    }

    /// Runs a full session: bind, accept one peer, receive one file.
    pub async fn run(&self, reporter: &dyn Reporter) -> Result<ReceivedFile, TransferError> {
        let listener = self.listen()?;
        let port = listener.local_addr().map_err(TransferError::Connection)?.port();
        reporter.on_progress(ProgressEvent::connecting(format!(
            "listening on port {port}, waiting for a connection..."
        )));
        self.accept_and_receive(listener, reporter).await
    }

    /// Accepts a single connection and receives one file from it.
    ///
    /// The listener is closed as soon as the peer is accepted, so no
    /// further connections are possible until a new listener is bound.
    pub async fn accept_and_receive(
        &self,
        listener: TcpListener,
        reporter: &dyn Reporter,
    ) -> Result<ReceivedFile, TransferError> {
        let (mut stream, peer) = cancellable(&self.cancel, listener.accept())
            .await?
            .map_err(TransferError::Connection)?;

        // Only one connection per session.
        drop(listener);

        info!(%peer, "receiver accepted connection");
        reporter.on_progress(ProgressEvent::connecting(format!(
            "accepted connection from {peer}"
        )));

        // The header must arrive in this single read.
        let mut buf = vec![0u8; BUFFER_SIZE];
        let n = cancellable(&self.cancel, stream.read(&mut buf))
            .await?
            .map_err(TransferError::Connection)?;

        let frame = TransferMetadata::parse(&buf[..n]).inspect_err(|e| {
            warn!(%peer, error = %e, "malformed header");
        })?;
        let size = frame.metadata.size;
        let (name, path) = destination_path(&self.config.download_dir, &frame.metadata.name)?;
        let leftover = frame.leftover.to_vec();

        if name != frame.metadata.name {
            warn!(raw = %frame.metadata.name, %name, "stripped directory components from file name");
        }
        info!(file = %name, size, "receiving file");
        reporter.on_progress(ProgressEvent::transferring(
            format!("preparing to receive {name} ({size} bytes)"),
            0.0,
        ));

        let mut file = File::create(&path).await?;
        let mut meter = ProgressMeter::new(size);

        let result = self
            .receive_body(&mut stream, &mut file, &mut buf, &leftover, &mut meter, &name, reporter)
            .await;

        // Partial output stays on disk; make sure what was received is written.
        let flushed = file.flush().await;
        drop(file);
        drop(stream);

        result?;
        flushed?;

        info!(file = %name, bytes = meter.transferred(), "file received");
        reporter.on_progress(ProgressEvent::done(format!("{name} received successfully")));

        Ok(ReceivedFile {
            name,
            path,
            bytes: meter.transferred(),
            peer,
        })
    }

    #[allow(clippy::too_many_arguments)]
    async fn receive_body(
        &self,
        stream: &mut TcpStream,
        file: &mut File,
        buf: &mut [u8],
        leftover: &[u8],
        meter: &mut ProgressMeter,
        name: &str,
        reporter: &dyn Reporter,
    ) -> Result<(), TransferError> {
        if !leftover.is_empty() {
            let take = leftover.len().min(remaining_usize(meter));
            if take < leftover.len() {
                debug!(
                    extra = leftover.len() - take,
                    "ignoring bytes past the declared size"
                );
            }
            if take > 0 {
                file.write_all(&leftover[..take]).await?;
                let pct = meter.advance(take as u64);
                reporter.on_progress(ProgressEvent::transferring(
                    format!("receiving {name}... {pct:.2}%"),
                    pct,
                ));
            }
        }

        while !meter.is_complete() {
            let to_read = remaining_usize(meter).min(buf.len());
            let n = cancellable(&self.cancel, stream.read(&mut buf[..to_read]))
                .await?
                .map_err(TransferError::Connection)?;
            if n == 0 {
                warn!(
                    received = meter.transferred(),
                    expected = meter.total(),
                    "peer closed before the declared size was reached"
                );
                return Err(TransferError::ConnectionDropped {
                    received: meter.transferred(),
                    expected: meter.total(),
                });
            }

            file.write_all(&buf[..n]).await?;
            let pct = meter.advance(n as u64);
            debug!(bytes = meter.transferred(), size = meter.total(), "chunk received");
            reporter.on_progress(ProgressEvent::transferring(
                format!("receiving {name}... {pct:.2}%"),
                pct,
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{ChannelReporter, TransferEvent};
    use lanxfer_protocol::{ErrorKind, Role};
    use std::path::Path;
    use tokio::sync::mpsc;

    fn receiver_in(dir: &Path, cancel: CancellationToken) -> Receiver {
        Receiver::new(
            TransferConfig {
                port: 0,
                download_dir: dir.to_path_buf(),
            },
            cancel,
        )
    }

    /// Starts a receiver on an ephemeral port and returns its port and task.
    fn spawn_receiver(
        dir: &Path,
    ) -> (
        u16,
        tokio::task::JoinHandle<Result<ReceivedFile, TransferError>>,
        mpsc::UnboundedReceiver<TransferEvent>,
    ) {
        let receiver = receiver_in(dir, CancellationToken::new());
        let listener = receiver.listen().unwrap();
        let port = listener.local_addr().unwrap().port();
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(async move {
            let reporter = ChannelReporter::new(Role::Receiver, tx);
            receiver.accept_and_receive(listener, &reporter).await
        });
        (port, handle, rx)
    }

    async fn raw_peer(port: u16, chunks: &[&[u8]]) {
        let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        for chunk in chunks {
            stream.write_all(chunk).await.unwrap();
        }
        stream.shutdown().await.unwrap();
    }

    fn dir_entries(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    #[tokio::test]
    async fn traversal_name_is_reduced_to_basename() {
        let root = tempfile::tempdir().unwrap();
        let inbox = root.path().join("inbox");
        std::fs::create_dir_all(&inbox).unwrap();

        let (port, handle, _rx) = spawn_receiver(&inbox);
        raw_peer(port, &[b"../../etc/evil<SEPARATOR>5", b"\x00evil"]).await;

        let received = handle.await.unwrap().unwrap();
        assert_eq!(received.name, "evil");
        assert_eq!(received.path, inbox.join("evil"));
        assert_eq!(std::fs::read(inbox.join("evil")).unwrap(), b"\x00evil");
        assert_eq!(dir_entries(root.path()), vec!["inbox".to_string()]);
    }

    #[tokio::test]
    async fn header_without_separator_is_protocol_error() {
        let dir = tempfile::tempdir().unwrap();
        let (port, handle, _rx) = spawn_receiver(dir.path());
        raw_peer(port, &[b"report.pdf 1024"]).await;

        let err = handle.await.unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolError);
        assert!(dir_entries(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn header_with_two_separators_is_protocol_error() {
        let dir = tempfile::tempdir().unwrap();
        let (port, handle, _rx) = spawn_receiver(dir.path());
        raw_peer(port, &[b"a<SEPARATOR>b<SEPARATOR>10"]).await;

        let err = handle.await.unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolError);
        assert!(dir_entries(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn peer_closing_without_header_is_protocol_error() {
        let dir = tempfile::tempdir().unwrap();
        let (port, handle, _rx) = spawn_receiver(dir.path());
        raw_peer(port, &[]).await;

        let err = handle.await.unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolError);
        assert!(dir_entries(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn short_body_leaves_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let (port, handle, _rx) = spawn_receiver(dir.path());

        let partial = vec![0xEEu8; 40];
        raw_peer(port, &[b"data.bin<SEPARATOR>100", &partial]).await;

        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(
            err,
            TransferError::ConnectionDropped {
                received: 40,
                expected: 100
            }
        ));
        assert_eq!(err.kind(), ErrorKind::ConnectionDropped);
        assert_eq!(std::fs::read(dir.path().join("data.bin")).unwrap(), partial);
    }

    #[tokio::test]
    async fn bytes_past_declared_size_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let (port, handle, _rx) = spawn_receiver(dir.path());
        raw_peer(port, &[b"a.txt<SEPARATOR>3\x01\x02\x03\x04\x05"]).await;

        let received = handle.await.unwrap().unwrap();
        assert_eq!(received.bytes, 3);
        assert_eq!(std::fs::read(dir.path().join("a.txt")).unwrap(), b"\x01\x02\x03");
    }

    #[tokio::test]
    async fn listener_is_one_shot() {
        let dir = tempfile::tempdir().unwrap();
        let (port, handle, _rx) = spawn_receiver(dir.path());
        raw_peer(port, &[b"one.txt<SEPARATOR>1", b"x"]).await;
        handle.await.unwrap().unwrap();

        let second = TcpStream::connect(("127.0.0.1", port)).await;
        assert!(second.is_err(), "listener still accepting after session end");
    }

    #[tokio::test]
    async fn listener_is_closed_after_protocol_error() {
        let dir = tempfile::tempdir().unwrap();
        let (port, handle, _rx) = spawn_receiver(dir.path());
        raw_peer(port, &[b"no separator here"]).await;

        let err = handle.await.unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolError);

        let second = TcpStream::connect(("127.0.0.1", port)).await;
        assert!(second.is_err(), "listener still accepting after a failed session");
    }

    #[tokio::test]
    async fn missing_download_dir_is_io_error() {
        let root = tempfile::tempdir().unwrap();
        let missing = root.path().join("not-here");
        let (port, handle, _rx) = spawn_receiver(&missing);

        let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        stream.write_all(b"a.txt<SEPARATOR>3abc").await.unwrap();
        let _ = stream.shutdown().await;

        let err = handle.await.unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IoError);
        assert!(!missing.exists(), "download dir must not be created");

        let second = TcpStream::connect(("127.0.0.1", port)).await;
        assert!(second.is_err());
    }

    #[tokio::test]
    async fn listener_closes_after_accept() {
        let dir = tempfile::tempdir().unwrap();
        let (port, handle, _rx) = spawn_receiver(dir.path());

        // First peer is accepted but stalls in the body.
        let mut first = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        first.write_all(b"slow.bin<SEPARATOR>10").await.unwrap();

        // Wait until the receiver has reported the header.
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        let second = TcpStream::connect(("127.0.0.1", port)).await;
        assert!(second.is_err());

        first.write_all(&[0x80; 10]).await.unwrap();
        first.shutdown().await.unwrap();
        assert_eq!(handle.await.unwrap().unwrap().bytes, 10);
    }

    #[tokio::test]
    async fn bind_conflict_is_bind_error() {
        let dir = tempfile::tempdir().unwrap();
        let taken = std::net::TcpListener::bind("0.0.0.0:0").unwrap();
        let port = taken.local_addr().unwrap().port();

        let receiver = Receiver::new(
            TransferConfig {
                port,
                download_dir: dir.path().to_path_buf(),
            },
            CancellationToken::new(),
        );
        let err = receiver.listen().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BindError);
    }

    #[tokio::test]
    async fn second_listener_on_same_port_is_bind_error() {
        let dir = tempfile::tempdir().unwrap();
        let first = receiver_in(dir.path(), CancellationToken::new());
        let listener = first.listen().unwrap();
        let port = listener.local_addr().unwrap().port();

        let second = Receiver::new(
            TransferConfig {
                port,
                download_dir: dir.path().to_path_buf(),
            },
            CancellationToken::new(),
        );
        let err = second.listen().unwrap_err();
        assert!(matches!(err, TransferError::Bind { .. }));
        drop(listener);
    }

    #[tokio::test]
    async fn cancel_while_waiting_for_peer() {
        let dir = tempfile::tempdir().unwrap();
        let cancel = CancellationToken::new();
        let receiver = receiver_in(dir.path(), cancel.clone());
        let (tx, mut rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(async move {
            let reporter = ChannelReporter::new(Role::Receiver, tx);
            receiver.run(&reporter).await
        });

        // Wait for the listening notification before cancelling.
        let first = rx.recv().await.unwrap();
        assert!(matches!(first, TransferEvent::Progress { .. }));
        cancel.cancel();

        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, TransferError::Cancelled));
    }

    #[tokio::test]
    async fn progress_reports_sanitized_name() {
        let dir = tempfile::tempdir().unwrap();
        let (port, handle, mut rx) = spawn_receiver(dir.path());
        raw_peer(port, &[b"/tmp/x/y.txt<SEPARATOR>2", b"ok"]).await;
        handle.await.unwrap().unwrap();

        let mut messages = Vec::new();
        while let Ok(TransferEvent::Progress { event, .. }) = rx.try_recv() {
            messages.push(event.message);
        }
        assert!(messages.iter().any(|m| m.contains("y.txt")));
        assert!(messages.iter().all(|m| !m.contains("/tmp/x")));
    }
}
