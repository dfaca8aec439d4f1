//! Adapter and discovery handlers.

use axum::{Json, extract::State, response::Response};
use serde::Serialize;
use std::sync::Arc;

use super::super::state::AppState;
use super::outcome_response;

#[derive(Debug, Serialize)]
pub struct BluetoothStatus {
    pub available: bool,
    pub enabled: bool,
    pub scanning: bool,
}

/// GET /api/bluetooth - adapter status.
pub async fn status(State(state): State<Arc<AppState>>) -> Json<BluetoothStatus> {
    let bridge = state.facade.bridge();
    Json(BluetoothStatus {
        available: bridge.is_available().await,
        enabled: bridge.is_enabled().await,
        scanning: bridge.is_scanning(),
    })
}

/// POST /api/bluetooth/enable - ask the platform to switch Bluetooth on.
pub async fn enable(State(state): State<Arc<AppState>>) -> Response {
    let outcome = state.facade.enable_bluetooth().await;
    outcome_response(outcome, state.facade.state())
}

/// POST /api/scan/start - start discovery; results show up in /api/state.
pub async fn start_scan(State(state): State<Arc<AppState>>) -> Response {
    let outcome = state.facade.start_scan().await;
    outcome_response(outcome, state.facade.state())
}

/// POST /api/scan/stop
pub async fn stop_scan(State(state): State<Arc<AppState>>) -> Response {
    let outcome = state.facade.stop_scan().await;
    outcome_response(outcome, state.facade.state())
}
