//! Header frame for a single-file transfer.
//!
//! # Wire format
//!
//! ```text
//! HEADER (Sender -> Receiver, one write):
//!   <name UTF-8><SEPARATOR><size as ASCII decimal>
//!
//! BODY (Sender -> Receiver):
//!   [size bytes: raw file data]
//! ```
//!
//! There is no length prefix, acknowledgment or end marker. The receiver
//! takes the header from a single read of at most [`BUFFER_SIZE`] bytes
//! and relies on the declared size to know when the body is complete.

use crate::constants::{BUFFER_SIZE, SEPARATOR};

/// Errors produced while encoding or parsing a header frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("connection closed before a header was received")]
    Empty,

    #[error("header has no separator")]
    MissingSeparator,

    #[error("header has more than one separator")]
    RepeatedSeparator,

    #[error("file name is not valid UTF-8")]
    InvalidName,

    #[error("file name has no usable final segment: {0:?}")]
    EmptyName(String),

    #[error("invalid size field: {0:?}")]
    InvalidSize(String),

    #[error("file name contains the separator token: {0:?}")]
    NameContainsSeparator(String),

    #[error("header is {0} bytes, more than a single read can hold")]
    TooLarge(usize),
}

/// Name and size of the file being transferred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferMetadata {
    /// File name. Senders put a basename here; receivers must still run
    /// it through [`sanitize_name`] before touching the filesystem.
    pub name: String,
    /// Total payload size in bytes.
    pub size: u64,
}

/// A header parsed out of the first read on a connection.
#[derive(Debug, PartialEq, Eq)]
pub struct ParsedFrame<'a> {
    pub metadata: TransferMetadata,
    /// Payload bytes that arrived in the same read as the header.
    pub leftover: &'a [u8],
}

impl TransferMetadata {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }

    /// Encodes the header frame.
    ///
    /// Refuses names the receiver could not split back out, and frames
    /// that would not fit in the receiver's single header read.
    pub fn encode(&self) -> Result<Vec<u8>, FrameError> {
        if self.name.contains(SEPARATOR) {
            return Err(FrameError::NameContainsSeparator(self.name.clone()));
        }

        let frame = format!("{}{SEPARATOR}{}", self.name, self.size).into_bytes();
        if frame.len() > BUFFER_SIZE {
            return Err(FrameError::TooLarge(frame.len()));
        }
        Ok(frame)
    }

    /// Parses the bytes of the receiver's single header read.
    ///
    /// The separator must appear exactly once. The size is the run of
    /// ASCII digits right after it; anything past that run is returned
    /// as [`ParsedFrame::leftover`].
    pub fn parse(buf: &[u8]) -> Result<ParsedFrame<'_>, FrameError> {
        if buf.is_empty() {
            return Err(FrameError::Empty);
        }
        if buf.len() > BUFFER_SIZE {
            return Err(FrameError::TooLarge(buf.len()));
        }

        let sep = SEPARATOR.as_bytes();
        let pos = find(buf, sep).ok_or(FrameError::MissingSeparator)?;
        let rest = &buf[pos + sep.len()..];
        if find(rest, sep).is_some() {
            return Err(FrameError::RepeatedSeparator);
        }

        let name = std::str::from_utf8(&buf[..pos]).map_err(|_| FrameError::InvalidName)?;

        let digits = rest.iter().take_while(|b| b.is_ascii_digit()).count();
        let size_field = &rest[..digits];
        let size = std::str::from_utf8(size_field)
            .ok()
            .filter(|s| !s.is_empty())
            .and_then(|s| s.parse::<u64>().ok())
            .ok_or_else(|| {
                let shown = &rest[..rest.len().min(32)];
                FrameError::InvalidSize(String::from_utf8_lossy(shown).into_owned())
            })?;

        Ok(ParsedFrame {
            metadata: TransferMetadata::new(name, size),
            leftover: &rest[digits..],
        })
    }
}

/// Returns the final path segment of `name`, dropping any directory parts.
///
/// `/`, `\` and the drive separator `:` all count as separators regardless
/// of host platform, so a name produced on either family of systems cannot
/// climb out of the destination directory or name another drive. Returns
/// `None` when nothing usable remains (empty, `.` or `..`).
pub fn sanitize_name(name: &str) -> Option<&str> {
    let last = name.rsplit(['/', '\\', ':']).next().unwrap_or_default();
    match last {
        "" | "." | ".." => None,
        s => Some(s),
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}
