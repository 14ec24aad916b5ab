// main.rs

mod config;
mod decode;
mod forward;
mod listener;
#[cfg(feature = "testing")]
mod sensor_sim;

use crate::config::RelayConfig;
use crate::listener::PortFormat;
use anyhow::Context;
use std::sync::Arc;
use telemetry_shared::TelemetryStore;
use tokio::net::UdpSocket;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cfg = RelayConfig::from_env();

    // --- Sockets ---
    // A port that cannot be bound is fatal; everything after this point
    // rides out its own failures.
    let stm32_socket = UdpSocket::bind(("0.0.0.0", cfg.stm32_port))
        .await
        .with_context(|| format!("failed to bind udp/{}", cfg.stm32_port))?;
    let ch_socket = UdpSocket::bind(("0.0.0.0", cfg.ch_port))
        .await
        .with_context(|| format!("failed to bind udp/{}", cfg.ch_port))?;

    // --- Shared state ---
    let store = Arc::new(TelemetryStore::new());
    let client = forward::build_client(cfg.forward_timeout)
        .context("failed to build the forwarding HTTP client")?;
    let (forward_handle, forward_rx) = forward::forward_channel(forward::FORWARD_QUEUE_DEPTH);

    info!(
        "relay up: STM32/BMP180 on udp/{}, CH on udp/{}, forwarding to {}",
        cfg.stm32_port, cfg.ch_port, cfg.backend_url
    );

    // --- Background tasks ---
    let _ft = tokio::spawn(forward::forward_task(
        forward_rx,
        client,
        cfg.backend_url.clone(),
    ));
    #[cfg(feature = "testing")]
    let _sim = tokio::spawn(sensor_sim::sim_task(cfg.stm32_port, cfg.ch_port));

    let dual = tokio::spawn(listener::listen(
        PortFormat::Stm32Bmp180,
        stm32_socket,
        store.clone(),
        forward_handle.clone(),
    ));
    let ch = tokio::spawn(listener::listen(
        PortFormat::Ch,
        ch_socket,
        store,
        forward_handle,
    ));

    // listeners run forever; parking main on them keeps the runtime alive
    let _ = tokio::join!(dual, ch);
    Ok(())
}
