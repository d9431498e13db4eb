//! Bounded per-device reading history.

use std::collections::VecDeque;

use telemetry_types::Reading;

use crate::models::DeviceStats;

/// Fixed-capacity FIFO of the most recent readings for one device.
///
/// Aggregates are recomputed over the whole buffer on every push, so they are
/// always exact for the current contents and a read is a plain copy.
#[derive(Debug, Clone)]
pub struct DeviceHistory {
    device_id: u8,
    capacity: usize,
    readings: VecDeque<Reading>,
    stats: DeviceStats,
}

impl DeviceHistory {
    /// Create a history holding its first reading.
    ///
    /// A history never exists empty; `capacity` is clamped to at least one.
    pub fn new(first: Reading, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let mut readings = VecDeque::with_capacity(capacity);
        readings.push_back(first);
        let stats = aggregate(first.device_id, &readings);
        Self {
            device_id: first.device_id,
            capacity,
            readings,
            stats,
        }
    }

    /// Append a reading, evicting the oldest one when full.
    pub fn push(&mut self, reading: Reading) {
        if self.readings.len() == self.capacity {
            self.readings.pop_front();
        }
        self.readings.push_back(reading);
        self.stats = aggregate(self.device_id, &self.readings);
    }

    /// Most recently pushed reading.
    pub fn latest(&self) -> Reading {
        // Non-empty from construction onward.
        self.readings[self.readings.len() - 1]
    }

    pub fn stats(&self) -> DeviceStats {
        self.stats
    }

    /// Held readings, oldest first.
    pub fn readings(&self) -> Vec<Reading> {
        self.readings.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

fn aggregate(device_id: u8, readings: &VecDeque<Reading>) -> DeviceStats {
    // Seeded from a held value so an all-NaN buffer reports NaN, not a sentinel.
    let first = readings
        .front()
        .copied()
        .unwrap_or(Reading::new(device_id, f32::NAN, 0));
    let mut min = f64::from(first.value);
    let mut max = min;
    let mut sum = 0.0f64;
    let mut oldest_timestamp = first.timestamp;
    let mut newest_timestamp = first.timestamp;

    for reading in readings {
        let value = f64::from(reading.value);
        min = min.min(value);
        max = max.max(value);
        sum += value;
        oldest_timestamp = oldest_timestamp.min(reading.timestamp);
        newest_timestamp = newest_timestamp.max(reading.timestamp);
    }

    let count = readings.len();
    DeviceStats {
        device_id,
        count,
        min,
        max,
        average: sum / count as f64,
        oldest_timestamp,
        newest_timestamp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_history_has_one_reading() {
        let history = DeviceHistory::new(Reading::new(4, 2.5, 10), 50);

        assert_eq!(history.len(), 1);
        assert!(!history.is_empty());
        assert_eq!(history.latest(), Reading::new(4, 2.5, 10));

        let stats = history.stats();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.min, 2.5);
        assert_eq!(stats.max, 2.5);
        assert_eq!(stats.average, 2.5);
        assert_eq!(stats.oldest_timestamp, 10);
        assert_eq!(stats.newest_timestamp, 10);
    }

    #[test]
    fn test_push_evicts_oldest() {
        let mut history = DeviceHistory::new(Reading::new(1, 0.0, 0), 3);
        for i in 1..5u64 {
            history.push(Reading::new(1, i as f32, i));
        }

        let values: Vec<f32> = history.readings().iter().map(|r| r.value).collect();
        assert_eq!(values, vec![2.0, 3.0, 4.0]);
        assert_eq!(history.latest().value, 4.0);

        let stats = history.stats();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.min, 2.0);
        assert_eq!(stats.max, 4.0);
        assert_eq!(stats.average, 3.0);
    }

    #[test]
    fn test_evicting_extreme_value_updates_min_max() {
        let mut history = DeviceHistory::new(Reading::new(1, -100.0, 0), 2);
        history.push(Reading::new(1, 1.0, 1));
        assert_eq!(history.stats().min, -100.0);

        history.push(Reading::new(1, 2.0, 2));
        assert_eq!(history.stats().min, 1.0);
        assert_eq!(history.stats().max, 2.0);
    }

    #[test]
    fn test_timestamps_not_assumed_monotonic() {
        let mut history = DeviceHistory::new(Reading::new(1, 0.0, 500), 10);
        history.push(Reading::new(1, 0.0, 100));
        history.push(Reading::new(1, 0.0, 900));

        let stats = history.stats();
        assert_eq!(stats.oldest_timestamp, 100);
        assert_eq!(stats.newest_timestamp, 900);
        assert_eq!(history.latest().timestamp, 900);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut history = DeviceHistory::new(Reading::new(1, 1.0, 1), 0);
        history.push(Reading::new(1, 2.0, 2));

        assert_eq!(history.capacity(), 1);
        assert_eq!(history.len(), 1);
        assert_eq!(history.latest().value, 2.0);
    }

    #[test]
    fn test_opposite_infinities_give_nan_average() {
        let mut history = DeviceHistory::new(Reading::new(1, f32::INFINITY, 0), 50);
        history.push(Reading::new(1, f32::NEG_INFINITY, 1));

        let stats = history.stats();
        assert_eq!(stats.min, f64::NEG_INFINITY);
        assert_eq!(stats.max, f64::INFINITY);
        assert!(stats.average.is_nan());
    }

    #[test]
    fn test_nan_value_does_not_panic() {
        let mut history = DeviceHistory::new(Reading::new(1, 1.0, 0), 50);
        history.push(Reading::new(1, f32::NAN, 1));

        let stats = history.stats();
        assert_eq!(stats.count, 2);
        assert!(stats.average.is_nan());
        assert!(history.latest().value.is_nan());
    }

    #[test]
    fn test_only_nan_values_report_nan_bounds() {
        let mut history = DeviceHistory::new(Reading::new(1, f32::NAN, 5), 50);
        history.push(Reading::new(1, f32::NAN, 3));

        let stats = history.stats();
        assert_eq!(stats.count, 2);
        assert!(stats.min.is_nan());
        assert!(stats.max.is_nan());
        assert!(stats.average.is_nan());
        assert_eq!(stats.oldest_timestamp, 3);
        assert_eq!(stats.newest_timestamp, 5);
    }

    #[test]
    fn test_nan_evicted_leaves_finite_bounds() {
        let mut history = DeviceHistory::new(Reading::new(1, f32::NAN, 0), 2);
        history.push(Reading::new(1, 4.0, 1));
        history.push(Reading::new(1, -1.0, 2));

        let stats = history.stats();
        assert_eq!(stats.min, -1.0);
        assert_eq!(stats.max, 4.0);
        assert_eq!(stats.average, 1.5);
    }
}
