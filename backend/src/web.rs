use crate::state::AppState;
use axum::{
    extract::ws::{Message, Utf8Bytes, WebSocket, WebSocketUpgrade},
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use telemetry_shared::{FieldMap, SensorGroup};
use tower_http::cors::CorsLayer;
use tracing::{debug, info};

/// Public router constructor
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(get_status))
        .route("/update", post(post_update))
        .route("/ws", get(ws_handler))
        // the dashboard loads from another origin
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Liveness / acknowledgement body.
#[derive(Serialize)]
pub struct StatusMsg {
    pub status: &'static str,
}

async fn get_status() -> Json<StatusMsg> {
    Json(StatusMsg { status: "running" })
}

/// Relay-facing ingest: `{"<GROUP>": {fields}, ...}`. Always acknowledged;
/// a stale or unknown group key is the sender's problem, not ours.
async fn post_update(
    State(state): State<Arc<AppState>>,
    Json(body): Json<BTreeMap<String, FieldMap>>,
) -> Json<StatusMsg> {
    apply_update(&state, body);
    Json(StatusMsg { status: "ok" })
}

fn apply_update(state: &AppState, body: BTreeMap<String, FieldMap>) {
    for (name, fields) in body {
        match SensorGroup::from_name(&name) {
            Some(group) => state.store.merge(group, fields),
            None => debug!("ignoring update for unknown group {name:?}"),
        }
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

async fn handle_ws(socket: WebSocket, state: Arc<AppState>) {
    let mut snapshots_rx = state.ws_tx.subscribe();
    let (mut sender, mut receiver) = socket.split();
    info!("viewer connected");

    // Task: server -> client (periodic snapshots)
    let send_task = async move {
        loop {
            match snapshots_rx.recv().await {
                Ok(text) => {
                    if sender
                        .send(Message::Text(Utf8Bytes::from(text)))
                        .await
                        .is_err()
                    {
                        // dead connection; dropping the receiver takes
                        // this viewer out of the fanout
                        break;
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {}
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    // Task: client -> server. Viewers have nothing to say; this side
    // only notices the disconnect.
    let recv_task = async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Text(text) = msg {
                debug!("ignoring viewer message {text:?}");
            }
        }
    };

    // Run both directions until one side ends
    tokio::join!(send_task, recv_task);
    info!("viewer disconnected");
}
