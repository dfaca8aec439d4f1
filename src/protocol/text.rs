//! # ESC/POS Text Styling Commands
//!
//! Text formatting commands. Every style is a printer register: once set it
//! applies to all subsequent text until changed or until `ESC @`.
//!
//! ## Text Styling Overview
//!
//! | Style | Command | Effect |
//! |-------|---------|--------|
//! | Alignment | ESC a n | left / center / right |
//! | Size | GS ! n | 2x height and/or width |
//! | Bold | ESC E n | **Emphasized** text |
//! | Reverse | ESC V n | see note on `reverse` |
//! | Underline | ESC - n | 1 or 2 dot underline |
//!
//! ## Text Alignment
//!
//! ```text
//! Left aligned (default)    |LEFT TEXT
//! Center aligned            |  CENTER TEXT
//! Right aligned             |      RIGHT TEXT
//! ```

use serde::{Deserialize, Serialize};

use super::commands::{ESC, GS};
use crate::command::Command;

// ============================================================================
// TEXT ALIGNMENT
// ============================================================================

/// Text alignment options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left = 0,
    Center = 1,
    Right = 2,
}

/// # Set Text Alignment (ESC a n)
///
/// Sets the alignment for subsequent text lines.
///
/// ## Protocol Details
///
/// | Format  | Bytes |
/// |---------|-------|
/// | ASCII   | ESC a n |
/// | Hex     | 1B 61 n |
/// | Decimal | 27 97 n |
///
/// ## Parameters
///
/// - `n = 0`: Left alignment (default)
/// - `n = 1`: Center alignment
/// - `n = 2`: Right alignment
///
/// ## Behavior
///
/// - Affects all subsequent text until changed
/// - Only takes effect at the start of a line
/// - Reset by ESC @ (initialize)
///
/// ## Example
///
/// ```
/// use boleta::protocol::text::{align, Alignment};
///
/// let center = align(Alignment::Center);
/// assert_eq!(center.as_bytes(), &[0x1B, 0x61, 0x01]);
/// ```
pub fn align(alignment: Alignment) -> Command {
    Command::from(vec![ESC, b'a', alignment as u8])
}

// ============================================================================
// CHARACTER SIZE
// ============================================================================

/// Character size presets for `GS ! n`.
///
/// The high nibble of `n` is the width multiplier minus one and the low
/// nibble the height multiplier minus one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextSize {
    #[default]
    Normal = 0x00,
    DoubleHeight = 0x01,
    DoubleWidth = 0x10,
    DoubleBoth = 0x11,
}

/// # Select Character Size (GS ! n)
///
/// ## Protocol Details
///
/// | Format  | Bytes |
/// |---------|-------|
/// | ASCII   | GS ! n |
/// | Hex     | 1D 21 n |
/// | Decimal | 29 33 n |
///
/// ## Size Table
///
/// | Size | n |
/// |------|---|
/// | Normal | 0x00 |
/// | Double height | 0x01 |
/// | Double width | 0x10 |
/// | Double both | 0x11 |
///
/// Double-width text halves the characters that fit on a line.
///
/// ## Example
///
/// ```
/// use boleta::protocol::text::{size, TextSize};
///
/// assert_eq!(size(TextSize::DoubleBoth).as_bytes(), &[0x1D, 0x21, 0x11]);
/// ```
pub fn size(text_size: TextSize) -> Command {
    Command::from(vec![GS, b'!', text_size as u8])
}

// ============================================================================
// TEXT EMPHASIS (BOLD)
// ============================================================================

/// # Turn Emphasized Mode On/Off (ESC E n)
///
/// ## Protocol Details
///
/// | Format  | Bytes |
/// |---------|-------|
/// | ASCII   | ESC E n |
/// | Hex     | 1B 45 n |
/// | Decimal | 27 69 n |
///
/// `n = 1` turns bold on, `n = 0` turns it off.
///
/// ## Example
///
/// ```
/// use boleta::command::Command;
/// use boleta::protocol::text::{bold, raw};
///
/// let data = Command::concat([bold(true), raw("IMPORTANT"), bold(false)]);
/// assert_eq!(&data.as_bytes()[..3], &[0x1B, 0x45, 0x01]);
/// ```
#[inline]
pub fn bold(on: bool) -> Command {
    Command::from(vec![ESC, b'E', u8::from(on)])
}

// ============================================================================
// REVERSE
// ============================================================================

/// # Reverse Mode On/Off (ESC V n)
///
/// ## Protocol Details
///
/// | Format  | Bytes |
/// |---------|-------|
/// | ASCII   | ESC V n |
/// | Hex     | 1B 56 n |
/// | Decimal | 27 86 n |
///
/// ## Note
///
/// On Epson firmware `ESC V` is 90° rotation and white/black reverse is
/// `GS B`. Many low-cost 58 mm Bluetooth printers map `ESC V` to reverse
/// printing instead; this byte sequence is kept for compatibility with
/// those devices.
#[inline]
pub fn reverse(on: bool) -> Command {
    Command::from(vec![ESC, b'V', u8::from(on)])
}

// ============================================================================
// UNDERLINE
// ============================================================================

/// Underline thickness for `ESC - n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Underline {
    #[default]
    Off = 0,
    /// 1 dot thick
    Single = 1,
    /// 2 dots thick
    Double = 2,
}

/// # Set Underline Mode (ESC - n)
///
/// Enables or disables underline for subsequent text.
///
/// ## Protocol Details
///
/// | Format  | Bytes |
/// |---------|-------|
/// | ASCII   | ESC - n |
/// | Hex     | 1B 2D n |
/// | Decimal | 27 45 n |
///
/// ## Note
///
/// Underline does not affect spaces or horizontal tabs.
#[inline]
pub fn underline(mode: Underline) -> Command {
    Command::from(vec![ESC, b'-', mode as u8])
}

// ============================================================================
// RAW TEXT
// ============================================================================

/// Raw text as UTF-8 bytes, unmodified.
///
/// No code page translation happens here. Printers without a UTF-8 code
/// page print non-ASCII characters as whatever their active table maps.
#[inline]
pub fn raw(text: &str) -> Command {
    Command::from(text.as_bytes())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alignment() {
        assert_eq!(align(Alignment::Left).as_bytes(), &[0x1B, 0x61, 0x00]);
        assert_eq!(align(Alignment::Center).as_bytes(), &[0x1B, 0x61, 0x01]);
        assert_eq!(align(Alignment::Right).as_bytes(), &[0x1B, 0x61, 0x02]);
    }

    #[test]
    fn test_size() {
        assert_eq!(size(TextSize::Normal).as_bytes(), &[0x1D, 0x21, 0x00]);
        assert_eq!(size(TextSize::DoubleHeight).as_bytes(), &[0x1D, 0x21, 0x01]);
        assert_eq!(size(TextSize::DoubleWidth).as_bytes(), &[0x1D, 0x21, 0x10]);
        assert_eq!(size(TextSize::DoubleBoth).as_bytes(), &[0x1D, 0x21, 0x11]);
    }

    #[test]
    fn test_bold() {
        assert_eq!(bold(true).as_bytes(), &[0x1B, 0x45, 0x01]);
        assert_eq!(bold(false).as_bytes(), &[0x1B, 0x45, 0x00]);
    }

    #[test]
    fn test_reverse() {
        assert_eq!(reverse(true).as_bytes(), &[0x1B, 0x56, 0x01]);
        assert_eq!(reverse(false).as_bytes(), &[0x1B, 0x56, 0x00]);
    }

    #[test]
    fn test_underline() {
        assert_eq!(underline(Underline::Off).as_bytes(), &[0x1B, 0x2D, 0x00]);
        assert_eq!(underline(Underline::Single).as_bytes(), &[0x1B, 0x2D, 0x01]);
        assert_eq!(underline(Underline::Double).as_bytes(), &[0x1B, 0x2D, 0x02]);
    }

    #[test]
    fn test_raw_text_is_utf8() {
        assert_eq!(raw("Hi").as_bytes(), b"Hi");
        assert_eq!(raw("café").as_bytes(), "café".as_bytes());
        assert!(raw("").is_empty());
    }

    #[test]
    fn test_enum_serde_names() {
        let json = serde_json::to_string(&TextSize::DoubleBoth).unwrap();
        assert_eq!(json, "\"double_both\"");
        let a: Alignment = serde_json::from_str("\"center\"").unwrap();
        assert_eq!(a, Alignment::Center);
    }
}
