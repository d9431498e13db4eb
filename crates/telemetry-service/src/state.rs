//! Application state shared by the ingestion listener and the HTTP handlers.
//!
//! # Ownership
//!
//! A single [`AppState`] is created at startup and handed to both servers as
//! an `Arc`. The [`DeviceStore`] inside it is the only shared mutable data;
//! its own per-device locks provide all the synchronization the two servers
//! need, so the state itself carries no lock.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde::Serialize;
use telemetry_store::DeviceStore;

use crate::config::Config;

/// Shared application state.
pub struct AppState {
    /// Per-device reading histories.
    pub store: DeviceStore,
    /// Configuration the service was started with.
    pub config: Config,
    /// Ingestion listener counters.
    pub ingest: IngestStats,
    started_at: Instant,
}

impl AppState {
    /// Create new application state.
    ///
    /// The store capacity comes from `config.store.history_capacity`.
    pub fn new(config: Config) -> Arc<Self> {
        let store = DeviceStore::with_capacity(config.store.history_capacity);
        Arc::new(Self {
            store,
            config,
            ingest: IngestStats::default(),
            started_at: Instant::now(),
        })
    }

    /// Seconds since the state was created.
    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

/// Counters maintained by the ingestion listener.
#[derive(Debug, Default)]
pub struct IngestStats {
    connections_accepted: AtomicU64,
    connections_open: AtomicU64,
    frames_accepted: AtomicU64,
    frames_rejected: AtomicU64,
}

impl IngestStats {
    /// Count a newly accepted connection.
    ///
    /// The connection stays counted as open until the returned guard drops.
    pub fn connection_opened(&self) -> ConnectionGuard<'_> {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.connections_open.fetch_add(1, Ordering::Relaxed);
        ConnectionGuard { stats: self }
    }

    /// Count a frame that passed its checksum.
    pub fn frame_accepted(&self) {
        self.frames_accepted.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a frame dropped for a bad checksum.
    pub fn frame_rejected(&self) {
        self.frames_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Current counter values.
    pub fn snapshot(&self) -> IngestSnapshot {
        IngestSnapshot {
            connections_accepted: self.connections_accepted.load(Ordering::Relaxed),
            connections_open: self.connections_open.load(Ordering::Relaxed),
            frames_accepted: self.frames_accepted.load(Ordering::Relaxed),
            frames_rejected: self.frames_rejected.load(Ordering::Relaxed),
        }
    }
}

/// Marks one ingestion connection as open for as long as it lives.
#[derive(Debug)]
pub struct ConnectionGuard<'a> {
    stats: &'a IngestStats,
}

impl Drop for ConnectionGuard<'_> {
    fn drop(&mut self) {
        self.stats.connections_open.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Point-in-time copy of [`IngestStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IngestSnapshot {
    pub connections_accepted: u64,
    pub connections_open: u64,
    pub frames_accepted: u64,
    pub frames_rejected: u64,
}
