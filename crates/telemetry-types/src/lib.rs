//! Reading type and binary frame codec for the telemetry service.
//!
//! This crate is shared by the ingestion listener, the device store, and any
//! client tooling that needs to produce frames.
//!
//! # Features
//!
//! - [`Reading`], the decoded sample carried through the pipeline
//! - [`frame`], the fixed-size 14-byte wire codec with XOR checksum
//! - [`FrameError`] for rejected frames
//!
//! # Example
//!
//! ```
//! use telemetry_types::{FrameError, Reading, frame};
//!
//! let mut bytes = frame::encode(&Reading::new(1, 23.5, 1_700_000_000));
//! assert!(frame::decode(&bytes).is_ok());
//!
//! bytes[13] ^= 0x01;
//! assert!(matches!(
//!     frame::decode(&bytes),
//!     Err(FrameError::ChecksumMismatch { .. })
//! ));
//! ```

pub mod error;
pub mod frame;
pub mod types;

pub use error::{FrameError, FrameResult};
pub use frame::FRAME_LEN;
pub use types::Reading;
