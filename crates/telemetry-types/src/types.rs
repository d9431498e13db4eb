//! Core types for telemetry data.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::FrameError;
use crate::frame;

/// One decoded telemetry sample.
///
/// Every bit pattern is a legal `Reading`: device id 0, timestamp 0 and
/// non-finite values (±∞, NaN) all pass through the pipeline unchanged.
/// Timestamps are seconds and are neither validated against the wall clock
/// nor required to be monotonic.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Reading {
    /// Sending device, 0-255.
    pub device_id: u8,
    /// Measured value.
    pub value: f32,
    /// Sender-supplied timestamp in seconds.
    pub timestamp: u64,
}

impl Reading {
    /// Create a new reading.
    #[must_use]
    pub fn new(device_id: u8, value: f32, timestamp: u64) -> Self {
        Self {
            device_id,
            value,
            timestamp,
        }
    }

    /// Decode a reading from a wire frame.
    ///
    /// Only the first [`frame::FRAME_LEN`] bytes are examined; extra bytes are
    /// ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use telemetry_types::Reading;
    ///
    /// let reading = Reading::new(7, 21.5, 1_700_000_000);
    /// let decoded = Reading::from_bytes(&reading.to_bytes()).unwrap();
    /// assert_eq!(decoded, reading);
    /// ```
    pub fn from_bytes(data: &[u8]) -> Result<Self, FrameError> {
        frame::decode(data)
    }

    /// Encode this reading as a checksummed wire frame.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; frame::FRAME_LEN] {
        frame::encode(self)
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "device {} value {} at {}",
            self.device_id, self.value, self.timestamp
        )
    }
}
