//! Binary ingestion frame codec.
//!
//! Every frame is exactly [`FRAME_LEN`] bytes; there is no length prefix, so a
//! stream is split purely by size.
//!
//! | offset | size | field | encoding |
//! |--------|------|-------|----------|
//! | 0 | 1 | device id | `u8` |
//! | 1 | 4 | value | `f32`, big-endian |
//! | 5 | 8 | timestamp | `u64`, big-endian |
//! | 13 | 1 | checksum | XOR of bytes 0..=12 |
//!
//! The checksum only guards against accidental corruption. It carries no
//! integrity guarantee against a deliberate sender.

use bytes::{Buf, BufMut};

use crate::error::FrameError;
use crate::types::Reading;

/// Total size of one frame in bytes.
pub const FRAME_LEN: usize = 14;

/// Number of bytes covered by the checksum.
pub const PAYLOAD_LEN: usize = FRAME_LEN - 1;

/// XOR of every byte in `data`.
///
/// # Examples
///
/// ```
/// use telemetry_types::frame::checksum;
///
/// assert_eq!(checksum(&[]), 0);
/// assert_eq!(checksum(&[0x0F, 0xF0]), 0xFF);
/// assert_eq!(checksum(&[0xAA, 0xAA]), 0x00);
/// ```
#[must_use]
pub fn checksum(data: &[u8]) -> u8 {
    data.iter().fold(0, |acc, b| acc ^ b)
}

/// Encode a reading into a checksummed frame.
#[must_use]
pub fn encode(reading: &Reading) -> [u8; FRAME_LEN] {
    let mut frame = [0u8; FRAME_LEN];
    {
        let mut buf = &mut frame[..PAYLOAD_LEN];
        buf.put_u8(reading.device_id);
        buf.put_f32(reading.value);
        buf.put_u64(reading.timestamp);
    }
    frame[PAYLOAD_LEN] = checksum(&frame[..PAYLOAD_LEN]);
    frame
}

/// Validate and decode one frame.
///
/// Returns [`FrameError::ChecksumMismatch`] when the trailing byte does not
/// match the payload, and [`FrameError::InsufficientBytes`] when `data` is
/// shorter than a frame. Bytes past [`FRAME_LEN`] are ignored.
pub fn decode(data: &[u8]) -> Result<Reading, FrameError> {
    if data.len() < FRAME_LEN {
        return Err(FrameError::InsufficientBytes {
            expected: FRAME_LEN,
            actual: data.len(),
        });
    }

    let received = data[PAYLOAD_LEN];
    let computed = checksum(&data[..PAYLOAD_LEN]);
    if received != computed {
        return Err(FrameError::ChecksumMismatch { received, computed });
    }

    let mut buf = &data[..PAYLOAD_LEN];
    let device_id = buf.get_u8();
    let value = buf.get_f32();
    let timestamp = buf.get_u64();

    Ok(Reading {
        device_id,
        value,
        timestamp,
    })
}
