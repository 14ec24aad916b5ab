//! Synthetic sensor traffic for bench work without the rig attached.
//! Feeds the relay's own ports over loopback, garbled frames included,
//! so the whole ingest path gets exercised.

use rand::RngExt;
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::{info, warn};

const SIM_PERIOD_MS: u64 = 100;

pub async fn sim_task(stm32_port: u16, ch_port: u16) {
    let socket = match UdpSocket::bind("127.0.0.1:0").await {
        Ok(socket) => socket,
        Err(err) => {
            warn!("sensor sim could not bind a socket: {err}");
            return;
        }
    };
    let dual_addr = format!("127.0.0.1:{stm32_port}");
    let ch_addr = format!("127.0.0.1:{ch_port}");
    info!("sensor sim feeding {dual_addr} and {ch_addr}");

    let mut ticker = tokio::time::interval(Duration::from_millis(SIM_PERIOD_MS));
    let mut tick: u64 = 0;
    loop {
        ticker.tick().await;
        tick += 1;
        if let Err(err) = socket.send_to(dual_port_frame().as_bytes(), &dual_addr).await {
            warn!("sensor sim send failed: {err}");
        }
        // motor channel reports at half the rate of the dual port
        if tick % 2 == 0 {
            if let Err(err) = socket.send_to(ch_frame().as_bytes(), &ch_addr).await {
                warn!("sensor sim send failed: {err}");
            }
        }
    }
}

fn dual_port_frame() -> String {
    let mut rng = rand::rng();
    match rng.random_range(0..12u32) {
        0..=4 => {
            // Accel [g]
            format!(
                "STM32:Accel: X={:.2}g, Y={:.2}g, Z={:.2}g",
                rng.random_range(-2.0..2.0),
                rng.random_range(-2.0..2.0),
                rng.random_range(-2.0..2.0)
            )
        }
        5..=8 => {
            // Gyro [deg/s]
            format!(
                "STM32:Gyro: X={:.2}/s, Y={:.2}/s, Z={:.2}/s",
                rng.random_range(-250.0..250.0),
                rng.random_range(-250.0..250.0),
                rng.random_range(-250.0..250.0)
            )
        }
        9 => {
            // Temp (C), Pressure (hPa), Altitude (m)
            format!(
                "BMP180:{{\"temp\": {:.1}, \"pressure\": {:.1}, \"altitude\": {:.1}}}",
                rng.random_range(15.0..35.0),
                rng.random_range(980.0..1040.0),
                rng.random_range(0.0..200.0)
            )
        }
        10 => "STM32:--------------------".to_string(),
        _ => {
            if rng.random_range(0..5u32) == 0 {
                "STM32:----------ACCIDENT DETECTED----------".to_string()
            } else {
                // garbled line, the way a reset mid-print comes out
                "STM32:Accel: X=?.??g, Y=?.#".to_string()
            }
        }
    }
}

fn ch_frame() -> String {
    let mut rng = rand::rng();
    format!(
        "{{\"TEMP\": {:.1}, \"VIB\": {:.2}, \"RPM\": {}}}",
        rng.random_range(25.0..90.0),
        rng.random_range(0.0..1.5),
        rng.random_range(800..6000)
    )
}
