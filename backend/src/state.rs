use std::sync::Arc;
use telemetry_shared::TelemetryStore;
use tokio::sync::broadcast;

pub struct AppState {
    /// Latest merged values per sensor group
    pub store: Arc<TelemetryStore>,

    /// Serialized state snapshots → every connected viewer
    pub ws_tx: broadcast::Sender<String>,
}
