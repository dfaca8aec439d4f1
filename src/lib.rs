//! # boleta - Bluetooth ESC/POS Printing Library
//!
//! boleta discovers, connects to, and prints on Bluetooth Classic (SPP)
//! thermal receipt printers using the ESC/POS command set. It provides:
//!
//! - **Protocol implementation**: ESC/POS command encoders
//! - **Layout**: width-aware receipt composition (rules, line items, QR)
//! - **Device bridge**: discovery, one RFCOMM connection, raw printing
//! - **State façade**: observable printer state for a UI or the HTTP API
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use boleta::{
//!     bridge::{BridgeConfig, DeviceBridge},
//!     layout::{self, Composer, RuleStyle},
//!     platform::bluez::BluezAdapter,
//!     protocol::{commands, text},
//! };
//!
//! # async fn example() -> Result<(), boleta::error::BoletaError> {
//! let bridge = DeviceBridge::new(Arc::new(BluezAdapter::default()), BridgeConfig::default());
//! bridge.connect_device("66:22:8E:11:22:33").await?;
//!
//! let composer = Composer::default();
//! let receipt = layout::combine([
//!     commands::init(),
//!     layout::text_aligned(text::Alignment::Center, "HELLO"),
//!     layout::new_line(),
//!     composer.horizontal_line(RuleStyle::Dashed),
//!     composer.line_item("Latte", 2, 4.50, 9.00),
//!     layout::new_lines(3),
//!     commands::cut(commands::CutType::Partial),
//! ]);
//!
//! bridge.print(&receipt).await?;
//! bridge.disconnect().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`protocol`] | ESC/POS command encoders |
//! | [`command`] | Encoded command value and its base64 transport form |
//! | [`layout`] | Receipt composer |
//! | [`printer`] | Paper profiles |
//! | [`platform`] | Bluetooth adapter seam (BlueZ, mock) |
//! | [`transport`] | RFCOMM TTY transport |
//! | [`bridge`] | Device bridge |
//! | [`facade`] | Observable printer state |
//! | [`receipt`] | Ready-made receipts |
//! | [`server`] | JSON HTTP API |
//! | [`error`] | Error types |

pub mod bridge;
pub mod command;
pub mod error;
pub mod facade;
pub mod layout;
pub mod platform;
pub mod printer;
pub mod protocol;
pub mod receipt;
pub mod server;
pub mod transport;

// Re-exports for convenience
pub use bridge::DeviceBridge;
pub use command::Command;
pub use error::BoletaError;
pub use facade::{PrinterFacade, PrinterState};
pub use layout::Composer;
pub use platform::Device;
pub use printer::PaperProfile;
