//! Main store implementation.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use telemetry_types::Reading;
use tracing::debug;

use crate::history::DeviceHistory;
use crate::models::{DeviceStats, StoreSummary};

/// Number of readings kept per device unless configured otherwise.
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

const DEVICE_SLOTS: usize = u8::MAX as usize + 1;

/// In-memory store of per-device reading histories.
///
/// Every possible device id owns its own lock, so writers for different
/// devices never contend and a reader only waits on writers for the same
/// device. Histories are created on the first reading for an id and live
/// until the store is dropped.
pub struct DeviceStore {
    slots: Box<[RwLock<Option<DeviceHistory>>]>,
    capacity: usize,
    total_samples: AtomicU64,
    active_devices: AtomicUsize,
}

impl DeviceStore {
    /// Create a store with [`DEFAULT_HISTORY_CAPACITY`] readings per device.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    /// Create a store keeping at most `capacity` readings per device.
    ///
    /// A capacity of zero is treated as one.
    pub fn with_capacity(capacity: usize) -> Self {
        let slots = (0..DEVICE_SLOTS).map(|_| RwLock::new(None)).collect();
        Self {
            slots,
            capacity: capacity.max(1),
            total_samples: AtomicU64::new(0),
            active_devices: AtomicUsize::new(0),
        }
    }

    /// Per-device history capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // === Write path ===

    /// Append a reading to its device's history.
    ///
    /// The append, any eviction, and the aggregate update happen under the
    /// device's write lock, so readers observe either the old or the new
    /// state and never a partial one.
    pub fn record(&self, reading: Reading) {
        let mut slot = self.write_slot(reading.device_id);
        match slot.as_mut() {
            Some(history) => history.push(reading),
            None => {
                debug!("First reading from device {}", reading.device_id);
                *slot = Some(DeviceHistory::new(reading, self.capacity));
                self.active_devices.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.total_samples.fetch_add(1, Ordering::Relaxed);
    }

    // === Read path ===

    /// Most recent reading for a device, or `None` if it was never seen.
    pub fn latest(&self, device_id: u8) -> Option<Reading> {
        self.read_slot(device_id).as_ref().map(DeviceHistory::latest)
    }

    /// Statistics over the readings currently held for a device.
    pub fn stats(&self, device_id: u8) -> Option<DeviceStats> {
        self.read_slot(device_id).as_ref().map(DeviceHistory::stats)
    }

    /// Readings currently held for a device, oldest first.
    pub fn history(&self, device_id: u8) -> Option<Vec<Reading>> {
        self.read_slot(device_id)
            .as_ref()
            .map(DeviceHistory::readings)
    }

    /// Ids of every device seen so far, ascending.
    pub fn devices(&self) -> Vec<u8> {
        (0..=u8::MAX)
            .filter(|&id| self.read_slot(id).is_some())
            .collect()
    }

    /// Store-wide counters.
    pub fn summary(&self) -> StoreSummary {
        StoreSummary {
            total_samples: self.total_samples.load(Ordering::Relaxed),
            active_devices: self.active_devices.load(Ordering::Relaxed),
        }
    }

    // A panic while holding a slot lock cannot leave a history half-updated
    // (each mutation is a single push), so poisoned locks are recovered.
    fn read_slot(&self, device_id: u8) -> RwLockReadGuard<'_, Option<DeviceHistory>> {
        self.slots[usize::from(device_id)]
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_slot(&self, device_id: u8) -> RwLockWriteGuard<'_, Option<DeviceHistory>> {
        self.slots[usize::from(device_id)]
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for DeviceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DeviceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceStore")
            .field("capacity", &self.capacity)
            .field("summary", &self.summary())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn mean(values: &[f32]) -> f64 {
        values.iter().map(|&v| f64::from(v)).sum::<f64>() / values.len() as f64
    }

    #[test]
    fn test_unknown_device_is_absent() {
        let store = DeviceStore::new();

        assert!(store.latest(7).is_none());
        assert!(store.stats(7).is_none());
        assert!(store.history(7).is_none());
        assert!(store.devices().is_empty());
    }

    #[test]
    fn test_record_and_latest() {
        let store = DeviceStore::new();
        store.record(Reading::new(7, 1.0, 100));
        store.record(Reading::new(7, 2.0, 50));

        assert_eq!(store.latest(7), Some(Reading::new(7, 2.0, 50)));
        assert!(store.latest(8).is_none());
    }

    #[test]
    fn test_sixty_readings_keep_last_fifty() {
        let store = DeviceStore::new();
        let values: Vec<f32> = (0..60).map(|i| i as f32 * 1.5 - 40.0).collect();

        for (i, &value) in values.iter().enumerate() {
            store.record(Reading::new(1, value, 1_000 + i as u64));
        }

        let stats = store.stats(1).unwrap();
        assert_eq!(stats.count, 50);
        assert_eq!(stats.min, f64::from(values[10]));
        assert_eq!(stats.max, f64::from(values[59]));
        assert!((stats.average - mean(&values[10..])).abs() < 1e-9);
        assert_eq!(stats.oldest_timestamp, 1_010);
        assert_eq!(stats.newest_timestamp, 1_059);

        assert_eq!(store.latest(1), Some(Reading::new(1, values[59], 1_059)));
        assert_eq!(store.history(1).unwrap().len(), 50);
        assert_eq!(store.summary().total_samples, 60);
    }

    #[test]
    fn test_custom_capacity() {
        let store = DeviceStore::with_capacity(5);
        for i in 0..12 {
            store.record(Reading::new(3, i as f32, i));
        }

        assert_eq!(store.capacity(), 5);
        assert_eq!(store.stats(3).unwrap().count, 5);
        assert_eq!(store.stats(3).unwrap().average, 9.0);
    }

    #[test]
    fn test_all_device_ids_independent() {
        let store = DeviceStore::new();
        for id in 0..=u8::MAX {
            store.record(Reading::new(id, f32::from(id), u64::from(id)));
        }

        assert_eq!(store.devices().len(), 256);
        assert_eq!(store.summary().active_devices, 256);
        for id in 0..=u8::MAX {
            let stats = store.stats(id).unwrap();
            assert_eq!(stats.count, 1);
            assert_eq!(stats.average, f64::from(id));
            assert_eq!(store.latest(id).unwrap().timestamp, u64::from(id));
        }
    }

    #[test]
    fn test_devices_sorted() {
        let store = DeviceStore::new();
        for id in [200u8, 3, 77, 3] {
            store.record(Reading::new(id, 0.0, 0));
        }

        assert_eq!(store.devices(), vec![3, 77, 200]);
        assert_eq!(store.summary().active_devices, 3);
        assert_eq!(store.summary().total_samples, 4);
    }

    #[test]
    fn test_concurrent_writers_distinct_devices() {
        let store = Arc::new(DeviceStore::new());
        let sent_per_device = [10usize, 50, 75, 120];

        thread::scope(|s| {
            for (device, &sent) in sent_per_device.iter().enumerate() {
                let store = Arc::clone(&store);
                s.spawn(move || {
                    for i in 0..sent {
                        store.record(Reading::new(device as u8, i as f32, i as u64));
                    }
                });
            }
        });

        for (device, &sent) in sent_per_device.iter().enumerate() {
            let stats = store.stats(device as u8).unwrap();
            let expected_count = sent.min(DEFAULT_HISTORY_CAPACITY);
            let kept: Vec<f32> = (sent - expected_count..sent).map(|i| i as f32).collect();

            assert_eq!(stats.count, expected_count);
            assert!((stats.average - mean(&kept)).abs() < 1e-9);
            assert_eq!(store.latest(device as u8).unwrap().value, (sent - 1) as f32);
        }
        assert_eq!(
            store.summary().total_samples,
            sent_per_device.iter().sum::<usize>() as u64
        );
    }

    #[test]
    fn test_concurrent_writers_same_device() {
        let store = Arc::new(DeviceStore::new());
        let writers = 8;
        let per_writer = 500;

        thread::scope(|s| {
            for w in 0..writers {
                let store = Arc::clone(&store);
                s.spawn(move || {
                    for i in 0..per_writer {
                        store.record(Reading::new(42, 1.0, (w * per_writer + i) as u64));
                    }
                });
            }
        });

        let stats = store.stats(42).unwrap();
        assert_eq!(stats.count, DEFAULT_HISTORY_CAPACITY);
        assert_eq!(stats.average, 1.0);
        assert_eq!(
            store.summary().total_samples,
            (writers * per_writer) as u64
        );
        assert_eq!(store.summary().active_devices, 1);
    }

    #[test]
    fn test_readers_never_see_partial_state() {
        let store = Arc::new(DeviceStore::with_capacity(10));
        store.record(Reading::new(9, 0.0, 0));

        thread::scope(|s| {
            let writer = Arc::clone(&store);
            s.spawn(move || {
                for i in 1..5_000u64 {
                    writer.record(Reading::new(9, 0.0, i));
                }
            });

            let reader = Arc::clone(&store);
            s.spawn(move || {
                for _ in 0..5_000 {
                    let stats = reader.stats(9).unwrap();
                    assert!(stats.count >= 1 && stats.count <= 10);
                    assert_eq!(stats.average, 0.0);
                    let held = reader.history(9).unwrap();
                    assert!(!held.is_empty() && held.len() <= 10);
                }
            });
        });
    }

    #[test]
    fn test_stats_serialization() {
        let store = DeviceStore::new();
        store.record(Reading::new(5, 2.0, 10));
        store.record(Reading::new(5, 4.0, 20));

        let json = serde_json::to_value(store.stats(5).unwrap()).unwrap();
        assert_eq!(json["count"], 2);
        assert_eq!(json["min"], 2.0);
        assert_eq!(json["max"], 4.0);
        assert_eq!(json["average"], 3.0);
        assert_eq!(json["device_id"], 5);
    }

    #[test]
    fn test_nan_only_device_stats_stay_in_buffer() {
        let store = DeviceStore::new();
        store.record(Reading::new(1, f32::NAN, 1));

        let stats = store.stats(1).unwrap();
        assert!(stats.min.is_nan());
        assert!(stats.max.is_nan());
        assert!(stats.average.is_nan());
    }
}
