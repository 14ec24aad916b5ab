use crate::state::AppState;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// Serializes the current state once per tick and fans it out to every
/// connected viewer. Runs for the life of the process.
pub async fn broadcast_task(state: Arc<AppState>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    loop {
        ticker.tick().await;
        let text = state.store.snapshot_json();
        // send errs only while nobody is subscribed
        if state.ws_tx.send(text).is_ok() {
            trace!("snapshot broadcast");
        }
    }
}
