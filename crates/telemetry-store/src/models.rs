//! Snapshot models returned by the store.

use serde::{Deserialize, Serialize};

/// Aggregate statistics over the readings currently held for one device.
///
/// Values follow IEEE-754 arithmetic: a history holding `+inf` and `-inf`
/// reports an average of NaN. Non-finite values serialize as JSON `null`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceStats {
    /// Device the statistics belong to.
    pub device_id: u8,
    /// Number of readings currently held.
    pub count: usize,
    /// Smallest value held.
    pub min: f64,
    /// Largest value held.
    pub max: f64,
    /// Arithmetic mean of the values held.
    pub average: f64,
    /// Smallest timestamp held.
    pub oldest_timestamp: u64,
    /// Largest timestamp held.
    pub newest_timestamp: u64,
}

/// Store-wide counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSummary {
    /// Valid readings recorded since startup, including evicted ones.
    pub total_samples: u64,
    /// Distinct devices seen since startup.
    pub active_devices: usize,
}
