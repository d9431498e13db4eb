//! HTTP query API.
//!
//! Every endpoint is a read-only snapshot of the [`DeviceStore`]; no handler
//! mutates it. A handler only takes the read lock of the one device it asks
//! about, so queries never queue behind ingestion for other devices.
//!
//! # Endpoints
//!
//! - `GET /device/{id}/latest` - Most recent reading
//! - `GET /device/{id}/stats` - count/min/max/average over the held readings
//! - `GET /device/{id}/history` - Held readings, oldest first
//! - `GET /devices` - Ids of all known devices
//! - `GET /health` - Liveness check
//! - `GET /metrics` - Store and listener counters
//!
//! ## Error Handling
//!
//! All errors are JSON bodies of the form `{"error": "..."}` produced by
//! [`AppError`]:
//!
//! - `400` when `{id}` is not an integer in `0..=255`
//! - `404` for unknown devices and unknown paths
//! - `405` for any method other than GET on a known path
//!
//! [`DeviceStore`]: telemetry_store::DeviceStore

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    handler::Handler,
    http::{Method, StatusCode, Uri},
    response::IntoResponse,
    routing::{MethodRouter, get},
};
use serde::Serialize;
use time::OffsetDateTime;
use tower_http::trace::TraceLayer;

use telemetry_store::DeviceStats;
use telemetry_types::Reading;

use crate::state::AppState;

/// Create the API router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get_only(health))
        .route("/metrics", get_only(metrics))
        .route("/devices", get_only(list_devices))
        .route("/device/{id}/latest", get_only(get_latest))
        .route("/device/{id}/stats", get_only(get_stats))
        .route("/device/{id}/history", get_only(get_history))
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(not_found)
}

/// A GET route that also answers HEAD with 405.
///
/// axum serves HEAD from the GET handler unless a HEAD handler is set.
fn get_only<H, T>(handler: H) -> MethodRouter<Arc<AppState>>
where
    H: Handler<T, Arc<AppState>>,
    T: 'static,
{
    get(handler).head(method_not_allowed)
}

/// The API router with request tracing, bound to `state`.
pub fn app(state: Arc<AppState>) -> Router {
    router().layer(TraceLayer::new_for_http()).with_state(state)
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: OffsetDateTime::now_utc(),
    })
}

/// Service-wide counters.
#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    /// Valid readings recorded since startup.
    pub total_samples: u64,
    /// Distinct devices seen since startup.
    pub active_devices: usize,
    /// Frames that passed their checksum since startup.
    pub frames_accepted: u64,
    /// Frames dropped for a bad checksum.
    pub frames_rejected: u64,
    /// Ingestion connections accepted since startup.
    pub connections_accepted: u64,
    /// Ingestion connections currently open.
    pub connections_open: u64,
    pub uptime_seconds: u64,
}

async fn metrics(State(state): State<Arc<AppState>>) -> Json<MetricsResponse> {
    let store = state.store.summary();
    let ingest = state.ingest.snapshot();

    Json(MetricsResponse {
        total_samples: store.total_samples,
        active_devices: store.active_devices,
        frames_accepted: ingest.frames_accepted,
        frames_rejected: ingest.frames_rejected,
        connections_accepted: ingest.connections_accepted,
        connections_open: ingest.connections_open,
        uptime_seconds: state.uptime_secs(),
    })
}

async fn list_devices(State(state): State<Arc<AppState>>) -> Json<Vec<u8>> {
    Json(state.store.devices())
}

/// Most recent reading for a device.
///
/// # Errors
///
/// - [`AppError::BadRequest`] if `id` is not a device id
/// - [`AppError::NotFound`] if the device has never sent a valid frame
async fn get_latest(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Reading>, AppError> {
    let device_id = parse_device_id(&id)?;
    state
        .store
        .latest(device_id)
        .map(Json)
        .ok_or_else(|| unknown_device(device_id))
}

/// Aggregate statistics for a device.
///
/// # Errors
///
/// Same as [`get_latest`].
async fn get_stats(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeviceStats>, AppError> {
    let device_id = parse_device_id(&id)?;
    state
        .store
        .stats(device_id)
        .map(Json)
        .ok_or_else(|| unknown_device(device_id))
}

async fn get_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Reading>>, AppError> {
    let device_id = parse_device_id(&id)?;
    state
        .store
        .history(device_id)
        .map(Json)
        .ok_or_else(|| unknown_device(device_id))
}

async fn method_not_allowed(method: Method, uri: Uri) -> AppError {
    AppError::MethodNotAllowed(format!("{} is not allowed on {}", method, uri.path()))
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("Endpoint {} not found", uri.path()))
}

/// Parse a path segment as a device id.
///
/// Only plain decimal digits are accepted; signs, whitespace and values above
/// 255 are rejected.
fn parse_device_id(raw: &str) -> Result<u8, AppError> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AppError::BadRequest(format!(
            "Invalid device ID '{}': expected a non-negative integer",
            raw
        )));
    }
    raw.parse::<u8>().map_err(|_| {
        AppError::BadRequest(format!(
            "Invalid device ID '{}': must be between 0 and 255",
            raw
        ))
    })
}

fn unknown_device(device_id: u8) -> AppError {
    AppError::NotFound(format!("No data for device {}", device_id))
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    MethodNotAllowed(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::MethodNotAllowed(msg) => (StatusCode::METHOD_NOT_ALLOWED, msg),
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, Json(body)).into_response()
    }
}
