//! TCP ingestion listener and HTTP query API for telemetry readings.
//!
//! This crate provides a service that:
//! - Accepts persistent TCP connections carrying back-to-back 14-byte frames
//! - Validates each frame's XOR checksum and silently drops bad ones
//! - Keeps the last 50 readings per device in memory with exact statistics
//! - Exposes a read-only JSON API over the stored data
//!
//! # REST API Endpoints
//!
//! - `GET /device/{id}/latest` - Latest reading for a device
//! - `GET /device/{id}/stats` - Statistics over the held readings
//! - `GET /device/{id}/history` - Held readings, oldest first
//! - `GET /devices` - Known device ids
//! - `GET /health` - Service health check
//! - `GET /metrics` - Store and listener counters
//!
//! # Configuration
//!
//! The service reads configuration from `~/.config/telemetry/server.toml`:
//!
//! ```toml
//! [ingest]
//! bind = "0.0.0.0:9001"
//! idle_timeout_secs = 300
//!
//! [http]
//! bind = "0.0.0.0:8080"
//!
//! [store]
//! history_capacity = 50
//! ```

pub mod api;
pub mod config;
pub mod ingest;
pub mod state;

pub use config::{Config, ConfigError, HttpConfig, IngestConfig, StoreConfig, ValidationError};
pub use ingest::{FrameCodec, IngestListener};
pub use state::{AppState, IngestSnapshot, IngestStats};
