//! Connector role.
//!
//! Connects to the receiver, writes the header frame describing the
//! chosen file, then streams the file in [`BUFFER_SIZE`] chunks.

use std::io::ErrorKind as IoErrorKind;
use std::net::SocketAddr;
use std::path::Path;

use lanxfer_protocol::{BUFFER_SIZE, ProgressEvent, TransferMetadata};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::TransferError;
use crate::progress::{ProgressMeter, Reporter, remaining_usize};
use crate::validation::validate_send_input;
use crate::{TransferConfig, cancellable};

/// A file that was fully sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentFile {
    /// Name announced in the header (basename of the source path).
    pub name: String,
    pub bytes: u64,
    pub peer: SocketAddr,
}

/// Sending side of a transfer.
pub struct Sender {
    config: TransferConfig,
    cancel: CancellationToken,
}

impl Sender {
    pub fn new(config: TransferConfig, cancel: CancellationToken) -> Self {
        Self { config, cancel }
    }

    /// Sends `file_path` to the receiver at `address` on the configured port.
    pub async fn send(
        &self,
        address: &str,
        file_path: &Path,
        reporter: &dyn Reporter,
    ) -> Result<SentFile, TransferError> {
        validate_send_input(address, file_path)?;
        let address = address.trim();
        let port = self.config.port;

        reporter.on_progress(ProgressEvent::connecting(format!(
            "connecting to {address}:{port}..."
        )));
        let mut stream = self.connect(address, port).await?;
        let peer = stream.peer_addr().map_err(TransferError::Connection)?;
        info!(%peer, "sender connected");

        let (name, size, mut file) = open_source(file_path).await?;
        let header = TransferMetadata::new(name.clone(), size).encode()?;

        reporter.on_progress(ProgressEvent::connecting(
            "connected, sending file information...",
        ));

        // Keep the header in its own segment where the transport allows it.
        stream.set_nodelay(true).map_err(TransferError::Connection)?;
        cancellable(&self.cancel, stream.write_all(&header))
            .await?
            .map_err(TransferError::Connection)?;
        info!(file = %name, size, "header sent");

        let mut meter = ProgressMeter::new(size);
        let mut buf = vec![0u8; BUFFER_SIZE];

        // Never put more than the declared size on the wire, even if the
        // file grew after it was stat'ed.
        while !meter.is_complete() {
            let n = file.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            let n = n.min(remaining_usize(&meter));

            cancellable(&self.cancel, stream.write_all(&buf[..n]))
                .await?
                .map_err(TransferError::Connection)?;
            let pct = meter.advance(n as u64);
            debug!(bytes = meter.transferred(), size, "chunk sent");
            reporter.on_progress(ProgressEvent::transferring(
                format!("sending {name}... {pct:.2}%"),
                pct,
            ));
        }

        if !meter.is_complete() {
            warn!(
                sent = meter.transferred(),
                size, "source file shrank during transfer"
            );
        }

        cancellable(&self.cancel, stream.shutdown())
            .await?
            .map_err(TransferError::Connection)?;
        drop(file);
        drop(stream);

        info!(file = %name, bytes = meter.transferred(), "file sent");
        reporter.on_progress(ProgressEvent::done(format!("{name} sent successfully")));

        Ok(SentFile {
            name,
            bytes: meter.transferred(),
            peer,
        })
    }

    /// Resolves `address` and connects to the first reachable candidate.
    async fn connect(&self, address: &str, port: u16) -> Result<TcpStream, TransferError> {
        let lookup = tokio::net::lookup_host((address, port));
        let addrs: Vec<SocketAddr> = cancellable(&self.cancel, lookup)
            .await?
            .map_err(|e| TransferError::InvalidAddress {
                address: address.to_string(),
                reason: e.to_string(),
            })?
            .collect();

        if addrs.is_empty() {
            return Err(TransferError::InvalidAddress {
                address: address.to_string(),
                reason: "no addresses found".into(),
            });
        }

        let mut last_err = None;
        for addr in addrs {
            match cancellable(&self.cancel, TcpStream::connect(addr)).await? {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    debug!(%addr, error = %e, "connect attempt failed");
                    last_err = Some((addr, e));
                }
            }
        }

        match last_err {
            Some((addr, e)) if e.kind() == IoErrorKind::ConnectionRefused => {
                Err(TransferError::ConnectionRefused(addr.to_string()))
            }
            Some((_, e)) => Err(TransferError::Connection(e)),
            None => Err(TransferError::InvalidAddress {
                address: address.to_string(),
                reason: "no addresses found".into(),
            }),
        }
    }
}

/// Stats and opens the source file, returning its basename and size.
async fn open_source(file_path: &Path) -> Result<(String, u64, File), TransferError> {
    let not_found = || TransferError::FileNotFound(file_path.display().to_string());

    let metadata = match tokio::fs::metadata(file_path).await {
        Ok(m) => m,
        Err(e) if e.kind() == IoErrorKind::NotFound => return Err(not_found()),
        Err(e) => return Err(e.into()),
    };
    if !metadata.is_file() {
        return Err(not_found());
    }

    let name = file_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or(TransferError::MissingInput("source file name"))?;

    let file = match File::open(file_path).await {
        Ok(f) => f,
        Err(e) if e.kind() == IoErrorKind::NotFound => return Err(not_found()),
        Err(e) => return Err(e.into()),
    };

    Ok((name, metadata.len(), file))
}
