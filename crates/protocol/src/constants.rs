/// Default TCP port the receiver listens on.
pub const PORT: u16 = 17888;

/// Size of a single read/write on either side of the transfer.
///
/// The receiver reads the header frame with exactly one read of at most
/// this many bytes, so an encoded header must never exceed it.
pub const BUFFER_SIZE: usize = 4096;

/// Literal token between the file name and the decimal size in the header.
pub const SEPARATOR: &str = "<SEPARATOR>";
