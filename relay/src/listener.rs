//! UDP ingest. One listener task per port; each datagram is decoded,
//! merged into the shared store, then queued for the backend. A bad
//! frame only costs itself: the loop moves straight on to the next one.

use crate::decode::{self, Rejected, SensorUpdate};
use crate::forward::ForwardHandle;
use std::sync::Arc;
use telemetry_shared::{SensorGroup, TelemetryStore};
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

const BUFFER_SIZE: usize = 1024;

/// Which wire format a port speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortFormat {
    /// STM32 text frames and BMP180 JSON frames, split by prefix.
    Stm32Bmp180,
    /// Bare JSON objects merged under the CH group.
    Ch,
}

pub async fn listen(
    format: PortFormat,
    socket: UdpSocket,
    store: Arc<TelemetryStore>,
    forward: ForwardHandle,
) {
    let local = socket
        .local_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "?".to_string());
    info!("listening on udp/{local} ({format:?})");

    let mut buf = vec![0u8; BUFFER_SIZE];
    loop {
        let len = match socket.recv_from(&mut buf).await {
            Ok((len, _src)) => len,
            Err(err) => {
                warn!("recv failed on udp/{local}: {err}");
                continue;
            }
        };
        handle_frame(format, &buf[..len], &store, &forward);
    }
}

/// Decode, merge, forward. Split out of the socket loop so the whole
/// pipeline can run against in-memory frames.
fn handle_frame(format: PortFormat, raw: &[u8], store: &TelemetryStore, forward: &ForwardHandle) {
    let decoded = match format {
        PortFormat::Stm32Bmp180 => decode::decode_dual_port(raw),
        PortFormat::Ch => decode::decode_ch_port(raw).map(|update| (SensorGroup::Ch, update)),
    };
    let (group, update) = match decoded {
        Ok(decoded) => decoded,
        Err(Rejected::Separator) => {
            debug!("skipping STM32 separator line");
            return;
        }
        Err(rejected) => {
            warn!(
                "dropping frame ({rejected}): {:?}",
                String::from_utf8_lossy(raw)
            );
            return;
        }
    };

    if let SensorUpdate::Accident { detected: true } = update {
        warn!("accident reported on the {} feed", group.as_str());
    }

    let fields = match group {
        SensorGroup::Stm32 => decode::stm32_merge_fields(update),
        _ => update.into_fields(),
    };
    // Merge before queueing so local state never lags what was sent out.
    store.merge(group, fields.clone());
    forward.submit(group, fields);
}
