//! Wire framing and shared event types for lanxfer.
//!
//! The protocol is a single text header frame followed by raw payload
//! bytes on the same TCP stream. See [`frame`] for the header format.

pub mod constants;
pub mod frame;
pub mod types;

// Re-export primary types for convenience.
pub use constants::{BUFFER_SIZE, PORT, SEPARATOR};
pub use frame::{FrameError, ParsedFrame, TransferMetadata, sanitize_name};
pub use types::{ErrorKind, Phase, ProgressEvent, Role, TransferOutcome, percent_of};
