//! # Error Types
//!
//! This module defines error types used throughout the boleta library.
//!
//! Bridge operations fail with exactly one of the Bluetooth kinds below and
//! carry the platform's message as context. The encoder and composer layers
//! are infallible.

use thiserror::Error;

/// Main error type for boleta operations
#[derive(Debug, Error)]
pub enum BoletaError {
    /// No Bluetooth adapter on this host
    #[error("Bluetooth is not available on this device")]
    NotAvailable,

    /// Adapter present but switched off
    #[error("Bluetooth is not enabled")]
    NotEnabled,

    /// No foreground surface to host the system enable prompt
    #[error("No UI context available to request Bluetooth enable")]
    NoUiContext,

    /// Discovery could not be started
    #[error("Discovery failed: {0}")]
    DiscoveryFailed(String),

    /// Socket connect failed (out of range, rejected pairing, ...)
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Socket close failed
    #[error("Disconnect failed: {0}")]
    DisconnectFailed(String),

    /// Print requested with no active connection
    #[error("No printer connected")]
    NotConnected,

    /// Payload is not valid transport encoding (base64)
    #[error("Invalid print data: {0}")]
    InvalidData(String),

    /// Write or flush to the printer socket failed
    #[error("Print failed: {0}")]
    PrintFailed(String),

    /// Transport-level errors (device nodes, helper tools)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Invalid configuration value
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Socket I/O outside a printer connection (the HTTP listener)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BoletaError {
    /// Stable error code, used by the HTTP surface.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotAvailable => "NOT_AVAILABLE",
            Self::NotEnabled => "NOT_ENABLED",
            Self::NoUiContext => "NO_UI_CONTEXT",
            Self::DiscoveryFailed(_) => "DISCOVERY_FAILED",
            Self::ConnectionFailed(_) => "CONNECTION_FAILED",
            Self::DisconnectFailed(_) => "DISCONNECT_FAILED",
            Self::NotConnected => "NOT_CONNECTED",
            Self::InvalidData(_) => "INVALID_DATA",
            Self::PrintFailed(_) => "PRINT_FAILED",
            Self::Transport(_) => "TRANSPORT_ERROR",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Io(_) => "IO_ERROR",
        }
    }
}
