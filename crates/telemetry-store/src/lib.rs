//! In-memory per-device history store for telemetry readings.
//!
//! This crate keeps a bounded FIFO of the most recent readings for every
//! device id (0-255) together with exact aggregate statistics over the held
//! readings.
//!
//! # Features
//!
//! - One lock per device id; writers for different devices never contend
//! - Oldest-first eviction once a device holds `capacity` readings (default 50)
//! - `count`, `min`, `max`, `average` and timestamp range per device
//! - Store-wide counters for monitoring
//!
//! Nothing is persisted; the store lives as long as the process.
//!
//! # Example
//!
//! ```
//! use telemetry_store::DeviceStore;
//! use telemetry_types::Reading;
//!
//! let store = DeviceStore::new();
//! store.record(Reading::new(1, 20.0, 1_700_000_000));
//! store.record(Reading::new(1, 22.0, 1_700_000_001));
//!
//! let stats = store.stats(1).unwrap();
//! assert_eq!(stats.count, 2);
//! assert_eq!(stats.average, 21.0);
//! assert!(store.latest(2).is_none());
//! ```

mod history;
mod models;
mod store;

pub use history::DeviceHistory;
pub use models::{DeviceStats, StoreSummary};
pub use store::{DEFAULT_HISTORY_CAPACITY, DeviceStore};
