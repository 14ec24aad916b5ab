//! Best-effort delivery of merged updates to the backend. Listeners hand
//! updates over a bounded channel and never wait on the network; the
//! forward task posts them one at a time and drops whatever fails.

use std::collections::BTreeMap;
use std::time::Duration;
use telemetry_shared::{FieldMap, SensorGroup};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Updates buffered between the listeners and the forward task.
pub const FORWARD_QUEUE_DEPTH: usize = 64;

type Outbound = (SensorGroup, FieldMap);

/// Listener-side handle. `submit` never blocks.
#[derive(Clone)]
pub struct ForwardHandle {
    tx: mpsc::Sender<Outbound>,
}

impl ForwardHandle {
    /// Queue an update for delivery. Dropped with a log line when the
    /// forward task is backed up; ingest never stalls on the backend.
    pub fn submit(&self, group: SensorGroup, fields: FieldMap) {
        if self.tx.try_send((group, fields)).is_err() {
            debug!("forwarder busy, dropping {} update", group.as_str());
        }
    }
}

pub fn forward_channel(depth: usize) -> (ForwardHandle, mpsc::Receiver<Outbound>) {
    let (tx, rx) = mpsc::channel(depth);
    (ForwardHandle { tx }, rx)
}

/// HTTP client for the forward task. The timeout bounds each delivery
/// attempt end to end.
pub fn build_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder().timeout(timeout).build()
}

/// Posts each queued update as `{"<GROUP>": {fields}}`. Failures and
/// non-success responses are logged and forgotten; there is no retry.
pub async fn forward_task(mut rx: mpsc::Receiver<Outbound>, client: reqwest::Client, url: String) {
    while let Some((group, fields)) = rx.recv().await {
        let body = BTreeMap::from([(group.as_str(), &fields)]);
        match client.post(&url).json(&body).send().await {
            Ok(resp) if resp.status().is_success() => {
                debug!("forwarded {} update", group.as_str());
            }
            Ok(resp) => {
                warn!(
                    "backend answered HTTP {} for {} update",
                    resp.status(),
                    group.as_str()
                );
            }
            Err(err) => {
                warn!("could not reach backend for {} update: {err}", group.as_str());
            }
        }
    }
}
