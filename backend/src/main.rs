// main.rs

mod broadcast_task;
mod state;
mod web;

use crate::state::AppState;
use anyhow::Context;
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use telemetry_shared::TelemetryStore;
use tokio::sync::broadcast;
use tracing::info;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_BROADCAST_MS: u64 = 1_000;
/// Snapshots buffered per viewer before a slow one starts skipping ahead.
const WS_CHANNEL_DEPTH: usize = 16;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let bind_addr =
        std::env::var("EVT_BACKEND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
    let broadcast_ms = std::env::var("EVT_BROADCAST_MS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_BROADCAST_MS);

    // --- Shared state ---
    let state = Arc::new(AppState {
        store: Arc::new(TelemetryStore::new()),
        ws_tx: broadcast::channel(WS_CHANNEL_DEPTH).0,
    });

    // --- Background tasks ---
    let _bt = tokio::spawn(broadcast_task::broadcast_task(
        state.clone(),
        Duration::from_millis(broadcast_ms),
    ));

    // --- Webserver ---
    let app: Router = web::router(state);

    info!("backend on {bind_addr}, snapshot cadence {broadcast_ms}ms");
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    axum::serve(listener, app).await?;
    Ok(())
}
