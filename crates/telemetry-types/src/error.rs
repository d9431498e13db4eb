//! Error types for frame decoding in telemetry-types.

use thiserror::Error;

/// Errors that can occur when decoding an ingestion frame.
///
/// Neither variant is fatal to a connection: the listener drops the offending
/// bytes and keeps reading.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum FrameError {
    /// The trailing checksum byte does not match the XOR of the payload.
    #[error("Checksum mismatch: frame carries {received:#04x}, computed {computed:#04x}")]
    ChecksumMismatch { received: u8, computed: u8 },

    /// Fewer bytes than a full frame were supplied.
    #[error("Frame requires {expected} bytes, got {actual}")]
    InsufficientBytes { expected: usize, actual: usize },
}

/// Result type alias using telemetry-types' FrameError type.
pub type FrameResult<T> = std::result::Result<T, FrameError>;
