//! # Printer Transport Layer
//!
//! This module provides the byte pipe to a connected printer.
//!
//! ## Available Transports
//!
//! - [`bluetooth`]: Bluetooth RFCOMM TTY for wireless printing (Linux)

pub mod bluetooth;

pub use bluetooth::BluetoothTransport;
