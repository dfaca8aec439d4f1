//! Device list and connection handlers.

use axum::{Json, extract::State, response::Response};
use serde::Deserialize;
use std::sync::Arc;

use crate::facade::PrinterState;
use crate::platform::Device;

use super::super::state::AppState;
use super::outcome_response;

/// GET /api/state - the façade snapshot, including the connected device.
pub async fn snapshot(State(state): State<Arc<AppState>>) -> Json<PrinterState> {
    Json(state.facade.state())
}

/// GET /api/devices/paired - bonded devices, refreshed on every call.
pub async fn paired(State(state): State<Arc<AppState>>) -> Json<Vec<Device>> {
    state.facade.refresh_paired().await;
    Json(state.facade.state().paired)
}

#[derive(Debug, Deserialize)]
pub struct ConnectRequest {
    /// MAC address of the printer
    pub id: String,
}

/// POST /api/connect - connect to a printer by MAC address.
pub async fn connect(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ConnectRequest>,
) -> Response {
    let outcome = state.facade.connect(req.id.trim()).await;
    outcome_response(outcome, state.facade.state())
}

/// POST /api/disconnect
pub async fn disconnect(State(state): State<Arc<AppState>>) -> Response {
    let outcome = state.facade.disconnect().await;
    outcome_response(outcome, state.facade.state())
}
