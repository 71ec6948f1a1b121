//! Error types for compression and decompression.

use thiserror::Error;

/// Error variants for compressor operations.
///
/// The model and coder arithmetic never fail; errors arise only from
/// configuration, framing, and I/O. A corrupt *coded stream* is not an
/// error: it decodes into garbage of the declared length.
#[derive(Debug, Error)]
pub enum Error {
    /// The configured arena cannot hold even the 256 nodes of the initial
    /// model (below 4 KiB).
    #[error("memory limit of {memory_mib} MiB is too small for the initial model")]
    MemoryLimit {
        /// The rejected limit, in MiB.
        memory_mib: u32,
    },

    /// The input is longer than the 32-bit length prefix can record.
    #[error("input of {len} bytes exceeds the 4 GiB frame limit")]
    InputTooLarge {
        /// Actual input length in bytes.
        len: usize,
    },

    /// The compressed input ends before its 4-byte length prefix does.
    #[error("compressed input of {len} bytes is shorter than its header")]
    TruncatedHeader {
        /// Actual input length in bytes.
        len: usize,
    },

    /// An I/O error occurred while writing or reading a coded stream.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized Result type for compressor operations.
pub type Result<T> = std::result::Result<T, Error>;
