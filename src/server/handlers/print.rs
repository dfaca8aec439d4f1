//! Print handlers.

use axum::{Json, extract::State, response::Response};
use serde::Deserialize;
use std::sync::Arc;

use crate::receipt;

use super::super::state::AppState;
use super::outcome_response;

#[derive(Debug, Deserialize)]
pub struct PrintRequest {
    /// Base64-encoded ESC/POS bytes
    pub payload: String,
}

/// POST /api/print - send raw ESC/POS bytes to the connected printer.
pub async fn print_raw(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PrintRequest>,
) -> Response {
    let outcome = state.facade.print_raw(&req.payload).await;
    outcome_response(outcome, state.facade.state())
}

/// POST /api/print/test - print the built-in test page.
pub async fn print_test(State(state): State<Arc<AppState>>) -> Response {
    let command = receipt::test_receipt(&state.composer);
    let outcome = state.facade.print(&command).await;
    outcome_response(outcome, state.facade.state())
}
