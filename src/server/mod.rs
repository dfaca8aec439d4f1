//! # HTTP Server for Bluetooth Printing
//!
//! A JSON API over the [`PrinterFacade`]: scan for printers, connect, and
//! send ESC/POS bytes from any HTTP client.
//!
//! ## Usage
//!
//! ```bash
//! boleta serve --listen 0.0.0.0:8080 --paper 58mm
//! ```
//!
//! | Route | Method | Body |
//! |-------|--------|------|
//! | `/api/bluetooth` | GET | |
//! | `/api/bluetooth/enable` | POST | |
//! | `/api/scan/start` | POST | |
//! | `/api/scan/stop` | POST | |
//! | `/api/devices/paired` | GET | |
//! | `/api/connect` | POST | `{"id": "00:11:22:33:44:55"}` |
//! | `/api/disconnect` | POST | |
//! | `/api/state` | GET | |
//! | `/api/print` | POST | `{"payload": "<base64>"}` |
//! | `/api/print/test` | POST | |
//!
//! Mutating routes answer `{"success", "code"?, "message", "state"}`.

mod handlers;
mod state;

pub use state::{AppState, ServerConfig};

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::BoletaError;
use crate::facade::PrinterFacade;

/// Build the API router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Adapter
        .route("/api/bluetooth", get(handlers::bluetooth::status))
        .route("/api/bluetooth/enable", post(handlers::bluetooth::enable))
        // Discovery
        .route("/api/scan/start", post(handlers::bluetooth::start_scan))
        .route("/api/scan/stop", post(handlers::bluetooth::stop_scan))
        // Devices
        .route("/api/devices/paired", get(handlers::devices::paired))
        .route("/api/connect", post(handlers::devices::connect))
        .route("/api/disconnect", post(handlers::devices::disconnect))
        .route("/api/state", get(handlers::devices::snapshot))
        // Printing
        .route("/api/print", post(handlers::print::print_raw))
        .route("/api/print/test", post(handlers::print::print_test))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

/// Start the HTTP server.
///
/// Mounts the façade, serves until Ctrl-C, then stops any scan and closes
/// the connection.
///
/// ## Example
///
/// ```no_run
/// use std::sync::Arc;
/// use boleta::bridge::{BridgeConfig, DeviceBridge};
/// use boleta::facade::PrinterFacade;
/// use boleta::platform::bluez::BluezAdapter;
/// use boleta::server::{serve, ServerConfig};
///
/// # async fn example() -> Result<(), boleta::error::BoletaError> {
/// let bridge = DeviceBridge::new(Arc::new(BluezAdapter::default()), BridgeConfig::default());
/// serve(ServerConfig::default(), PrinterFacade::new(bridge)).await?;
/// # Ok(())
/// # }
/// ```
pub async fn serve(config: ServerConfig, facade: PrinterFacade) -> Result<(), BoletaError> {
    let mounted = facade.mount().await;
    info!(success = mounted.success, status = %mounted.message, "Printer facade mounted");

    let app_state = Arc::new(AppState::new(config.clone(), facade.clone()));
    let app = router(app_state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .map_err(|e| {
            BoletaError::Transport(format!("Failed to bind to {}: {}", config.listen_addr, e))
        })?;

    info!(listen = %config.listen_addr, paper = config.paper.name, "boleta HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    info!("Shutting down");
    facade.unmount().await;
    let closed = facade.disconnect().await;
    info!(status = %closed.message, "Connection closed");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{BridgeConfig, DeviceBridge};
    use crate::platform::Device;
    use crate::platform::mock::MockAdapter;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use std::time::Duration;
    use tower::ServiceExt;

    fn app(mock: &MockAdapter) -> Router {
        let bridge = DeviceBridge::new(
            Arc::new(mock.clone()),
            BridgeConfig {
                discovery_settle: Duration::from_millis(1),
            },
        );
        let facade = PrinterFacade::new(bridge);
        router(Arc::new(AppState::new(ServerConfig::default(), facade)))
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_bluetooth_status() {
        let app = app(&MockAdapter::new());
        let (status, body) = call(&app, "GET", "/api/bluetooth", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"available": true, "enabled": true, "scanning": false}));
    }

    #[tokio::test]
    async fn test_paired_devices() {
        let mock = MockAdapter::new();
        mock.add_bonded(Device::bonded("00:11:22:33:44:55", "PT-210"));
        let app = app(&mock);

        let (_, body) = call(&app, "GET", "/api/devices/paired", None).await;
        assert_eq!(body, json!([{"id": "00:11:22:33:44:55", "name": "PT-210"}]));
    }

    #[tokio::test]
    async fn test_print_without_connection() {
        let app = app(&MockAdapter::new());
        let (status, body) = call(&app, "POST", "/api/print", Some(json!({"payload": "G0A="}))).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["code"], json!("NOT_CONNECTED"));
    }

    #[tokio::test]
    async fn test_connect_then_print() {
        let mock = MockAdapter::new();
        let app = app(&mock);

        let (status, body) = call(&app, "POST", "/api/connect", Some(json!({"id": "00:11:22:33:44:55"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"]["connected"]["id"], json!("00:11:22:33:44:55"));

        let (status, body) = call(&app, "POST", "/api/print", Some(json!({"payload": "G0AK"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));
        assert_eq!(mock.written(), vec![0x1B, 0x40, 0x0A]);

        let (status, body) = call(&app, "POST", "/api/print", Some(json!({"payload": "%%%"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], json!("INVALID_DATA"));
    }

    #[tokio::test]
    async fn test_print_test_page() {
        let mock = MockAdapter::new();
        let app = app(&mock);
        call(&app, "POST", "/api/connect", Some(json!({"id": "00:11:22:33:44:55"}))).await;

        let (status, _) = call(&app, "POST", "/api/print/test", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(&mock.written()[..2], &[0x1B, 0x40]);
    }

    #[tokio::test]
    async fn test_scan_disabled() {
        let mock = MockAdapter::new();
        mock.set_enabled(false);
        let app = app(&mock);

        let (status, body) = call(&app, "POST", "/api/scan/start", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], json!("NOT_ENABLED"));
    }
}
