//! Error types for TFTP transfers.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type for transfer operations.
pub type Result<T> = std::result::Result<T, TransferError>;

/// Errors that end a transfer.
///
/// Every variant is terminal: the session that produced it has already
/// released its endpoint and file handle by the time the caller sees it.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The server host name or address could not be resolved.
    #[error("could not resolve server address '{host}': {reason}")]
    HostResolution { host: String, reason: String },

    /// The local file to upload does not exist.
    #[error("no file found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// A packet could not be built from the given fields.
    #[error("cannot encode packet: {0}")]
    Encoding(String),

    /// A received datagram is too short or malformed.
    #[error("cannot decode packet of {len} bytes: {reason}")]
    Decoding { len: usize, reason: &'static str },

    /// The server answered with an ERROR packet.
    #[error("error from server (code {code}): {message}")]
    Protocol { code: u16, message: String },

    /// No valid ACK arrived for a block within the retry budget.
    #[error("failed to receive valid ACK for block #{block} after {attempts} attempts")]
    AckTimeoutExhausted { block: u16, attempts: u32 },

    /// The server went silent while we were waiting for a DATA block.
    #[error("transfer stalled waiting for block #{block} ({waited:?})")]
    Stalled { block: u16, waited: Duration },

    /// Local file or socket failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
