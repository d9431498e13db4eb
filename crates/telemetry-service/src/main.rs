//! Telemetry Service - TCP ingestion listener and HTTP query API.
//!
//! Run with: `cargo run -p telemetry-service`

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use telemetry_service::{AppState, Config, IngestListener, api};

/// Telemetry Service - TCP ingestion listener and HTTP query API.
#[derive(Parser, Debug)]
#[command(name = "telemetry-service")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Ingestion listener bind address (overrides config).
    #[arg(short, long)]
    ingest_bind: Option<String>,

    /// HTTP API bind address (overrides config).
    #[arg(short = 'b', long)]
    http_bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("telemetry_service=info".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default().unwrap_or_else(|e| {
            warn!("Ignoring default config: {}", e);
            Config::default()
        }),
    };

    // Override config with CLI args
    if let Some(bind) = args.ingest_bind {
        config.ingest.bind = bind;
    }
    if let Some(bind) = args.http_bind {
        config.http.bind = bind;
    }
    config.validate()?;

    let state = AppState::new(config.clone());
    let shutdown = CancellationToken::new();

    // Both sockets are bound before anything is served so a port conflict
    // aborts startup.
    let ingest = IngestListener::bind(config.ingest.bind.as_str(), Arc::clone(&state))
        .await
        .with_context(|| format!("Failed to bind ingestion listener on {}", config.ingest.bind))?;
    let http = tokio::net::TcpListener::bind(config.http.bind.as_str())
        .await
        .with_context(|| format!("Failed to bind HTTP API on {}", config.http.bind))?;

    info!(
        "Keeping up to {} readings per device",
        state.store.capacity()
    );

    let ingest_task = tokio::spawn(ingest.run(shutdown.clone()));

    let signal = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        info!("Shutdown requested");
        signal.cancel();
    });

    info!("Starting HTTP API on {}", http.local_addr()?);
    axum::serve(http, api::app(state))
        .with_graceful_shutdown(shutdown.clone().cancelled_owned())
        .await?;

    shutdown.cancel();
    ingest_task.await?;

    Ok(())
}
