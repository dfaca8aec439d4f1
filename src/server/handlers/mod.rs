//! HTTP handlers for the server.

pub mod bluetooth;
pub mod devices;
pub mod print;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::facade::{Outcome, PrinterState};

/// Body of every mutating endpoint.
#[derive(Debug, Serialize)]
pub struct OutcomeBody {
    #[serde(flatten)]
    pub outcome: Outcome,
    pub state: PrinterState,
}

/// HTTP status for a failed outcome's error code.
fn status_for(code: Option<&str>) -> StatusCode {
    match code {
        None => StatusCode::OK,
        Some("INVALID_DATA") => StatusCode::BAD_REQUEST,
        Some("NOT_CONNECTED") | Some("NO_UI_CONTEXT") => StatusCode::CONFLICT,
        Some("NOT_AVAILABLE") | Some("NOT_ENABLED") => StatusCode::SERVICE_UNAVAILABLE,
        Some(_) => StatusCode::BAD_GATEWAY,
    }
}

pub(super) fn outcome_response(outcome: Outcome, state: PrinterState) -> Response {
    let status = status_for(outcome.code);
    (status, Json(OutcomeBody { outcome, state })).into_response()
}
