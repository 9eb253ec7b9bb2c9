use std::path::{Path, PathBuf};

use lanxfer_protocol::{FrameError, sanitize_name};

use crate::TransferError;

/// Checks the sender's inputs before any connection is attempted.
///
/// Rejects:
/// - An empty or whitespace-only destination address
/// - An empty source path (no file chosen)
pub fn validate_send_input(address: &str, file_path: &Path) -> Result<(), TransferError> {
    if address.trim().is_empty() {
        return Err(TransferError::MissingInput("destination address"));
    }
    if file_path.as_os_str().is_empty() {
        return Err(TransferError::MissingInput("source file"));
    }
    Ok(())
}

/// Resolves where a received file named `raw_name` is written.
///
/// Only the final segment of `raw_name` is kept, so the result is always a
/// direct child of `download_dir`. Returns the bare name alongside the path.
pub fn destination_path(
    download_dir: &Path,
    raw_name: &str,
) -> Result<(String, PathBuf), TransferError> {
    let name = sanitize_name(raw_name)
        .ok_or_else(|| FrameError::EmptyName(raw_name.to_string()))?
        .to_string();
    let path = download_dir.join(&name);
    Ok((name, path))
}
