//! # ESC/POS Protocol Implementation
//!
//! This module provides low-level command builders for the ESC/POS protocol
//! spoken by most thermal receipt printers.
//!
//! ## Module Structure
//!
//! - [`commands`]: Basic printer commands (init, feed, cut)
//! - [`text`]: Text styling (alignment, size, bold, reverse, underline)
//! - [`barcode`]: QR codes via the printer's symbol generator
//!
//! ## Usage Example
//!
//! ```
//! use boleta::command::Command;
//! use boleta::protocol::commands::{self, CutType};
//! use boleta::protocol::text::{self, Alignment};
//!
//! let data = Command::concat([
//!     commands::init(),
//!     text::align(Alignment::Center),
//!     text::bold(true),
//!     text::raw("RECEIPT"),
//!     commands::line_feed(),
//!     text::bold(false),
//!     text::align(Alignment::Left),
//!     commands::cut(CutType::Partial),
//! ]);
//!
//! // Send `data` to the printer via the bridge...
//! # assert_eq!(&data.as_bytes()[..2], &[0x1B, 0x40]);
//! ```
//!
//! Every function returns exactly the bytes tabulated in its docs; this is
//! the compatibility surface with physical printers.

pub mod barcode;
pub mod commands;
pub mod text;
