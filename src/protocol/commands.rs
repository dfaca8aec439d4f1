//! # ESC/POS Basic Commands
//!
//! Initialization, paper feed and cutter control for ESC/POS thermal
//! printers (Epson TM series and the many 58 mm / 80 mm Bluetooth clones
//! that follow it).
//!
//! ## Escape Sequence Structure
//!
//! Commands follow these patterns:
//! - Single byte: `LF`, `FF`
//! - Prefixed with parameter: `ESC a n`, `GS V m`
//! - Length-framed function blocks: `GS ( k pL pH cn fn ...`
//!
//! ## Byte Order
//!
//! Multi-byte lengths use **little-endian** encoding:
//! - `u16` value 0x1234 is sent as bytes `[0x34, 0x12]`
//!
//! ## Reference
//!
//! Based on the Epson "ESC/POS Application Programming Guide".

use serde::{Deserialize, Serialize};

use crate::command::Command;

// ============================================================================
// ESCAPE SEQUENCE CONSTANTS
// ============================================================================

/// ESC (Escape) - Command prefix byte
///
/// Most ESC/POS commands begin with ESC (0x1B). This byte signals the start
/// of a control sequence rather than printable text.
pub const ESC: u8 = 0x1B;

/// GS (Group Separator) - Extended command prefix
///
/// Used for character size, cutter and two-dimensional code commands.
/// - Hex: 0x1D, Decimal: 29
pub const GS: u8 = 0x1D;

/// LF (Line Feed) - Print and advance one line
///
/// Prints any data in the line buffer and advances paper by the current
/// line spacing amount.
pub const LF: u8 = 0x0A;

/// FF (Form Feed) - Print and eject
///
/// In standard mode most receipt printers treat this as "print buffer";
/// in page mode it prints the composed page.
pub const FF: u8 = 0x0C;

// ============================================================================
// INITIALIZATION COMMANDS
// ============================================================================

/// # Initialize Printer (ESC @)
///
/// Resets the printer to its power-on default state. This should be called
/// at the start of each print job to ensure consistent behavior.
///
/// ## Protocol Details
///
/// | Format  | Bytes |
/// |---------|-------|
/// | ASCII   | ESC @ |
/// | Hex     | 1B 40 |
/// | Decimal | 27 64 |
///
/// ## What Gets Reset
///
/// - Print buffer is cleared
/// - Bold, underline and reverse disabled
/// - Character size reset to 1x1
/// - Alignment reset to left
///
/// ## Example
///
/// ```
/// use boleta::protocol::commands;
///
/// let init = commands::init();
/// assert_eq!(init.as_bytes(), &[0x1B, 0x40]);
/// ```
#[inline]
pub fn init() -> Command {
    Command::from(vec![ESC, b'@'])
}

// ============================================================================
// PAPER FEED COMMANDS
// ============================================================================

/// # Line Feed (LF)
///
/// | Format | Bytes |
/// |--------|-------|
/// | Hex    | 0A    |
#[inline]
pub fn line_feed() -> Command {
    Command::from(vec![LF])
}

/// # Form Feed (FF)
///
/// | Format | Bytes |
/// |--------|-------|
/// | Hex    | 0C    |
#[inline]
pub fn form_feed() -> Command {
    Command::from(vec![FF])
}

// ============================================================================
// CUTTER CONTROL COMMANDS
// ============================================================================

/// Cutter modes for `GS V m`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CutType {
    /// Cut all the way through the paper
    #[default]
    Full = 0,
    /// Leave a small hinge so the receipt stays on the roll
    Partial = 1,
}

/// # Cut Paper (GS V m)
///
/// Cuts at the current position. Printers without an auto-cutter ignore
/// this command.
///
/// ## Protocol Details
///
/// | Format  | Bytes     |
/// |---------|-----------|
/// | ASCII   | GS V m    |
/// | Hex     | 1D 56 m   |
/// | Decimal | 29 86 m   |
///
/// ## Parameters
///
/// - `m = 0`: Full cut
/// - `m = 1`: Partial cut
///
/// ## Example
///
/// ```
/// use boleta::protocol::commands::{cut, CutType};
///
/// assert_eq!(cut(CutType::Partial).as_bytes(), &[0x1D, 0x56, 0x01]);
/// ```
#[inline]
pub fn cut(kind: CutType) -> Command {
    Command::from(vec![GS, b'V', kind as u8])
}

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Encode a u16 value as little-endian bytes [low, high]
///
/// ## Example
///
/// ```
/// use boleta::protocol::commands::u16_le;
///
/// assert_eq!(u16_le(0x1234), [0x34, 0x12]);
/// assert_eq!(u16_le(259), [0x03, 0x01]);
/// ```
#[inline]
pub const fn u16_le(value: u16) -> [u8; 2] {
    [value as u8, (value >> 8) as u8]
}

// ============================================================================
// TESTS
// ============================================================================
