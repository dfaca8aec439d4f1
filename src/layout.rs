//! # Receipt Layout
//!
//! Helpers that compose encoded commands into printable receipt lines.
//!
//! Width-independent helpers are free functions; anything that pads or
//! fills a line lives on [`Composer`], which carries the [`PaperProfile`]
//! so the same code lays out 58 mm and 80 mm receipts.
//!
//! ## Example
//!
//! ```
//! use boleta::layout::{self, Composer, RuleStyle};
//! use boleta::protocol::{commands, text::Alignment};
//!
//! let composer = Composer::default();
//! let receipt = layout::combine([
//!     commands::init(),
//!     layout::text_aligned(Alignment::Center, "CAFE BOLETA"),
//!     layout::new_line(),
//!     composer.horizontal_line(RuleStyle::Normal),
//!     composer.line_item("Latte", 2, 4.50, 9.00),
//!     composer.justify_line("TOTAL", "9.00"),
//!     layout::new_lines(3),
//! ]);
//! assert!(!receipt.is_empty());
//! ```
//!
//! Widths are counted in `char`s, which matches the printer's columns for
//! single-byte code pages.

use serde::{Deserialize, Serialize};

use crate::command::Command;
use crate::printer::PaperProfile;
use crate::protocol::barcode::qr;
use crate::protocol::commands;
use crate::protocol::text::{self, Alignment};

/// Marker appended to truncated text.
pub const ELLIPSIS: &str = "...";

/// Minimum spaces kept between the two columns of [`Composer::justify_line`].
pub const DEFAULT_JUSTIFY_GAP: usize = 10;

/// Concatenate commands in call order.
///
/// No reordering or deduplication; zero commands give the empty sequence.
pub fn combine<I>(commands: I) -> Command
where
    I: IntoIterator<Item = Command>,
{
    commands.into_iter().collect()
}

/// Alignment command followed by raw text.
///
/// Alignment is a printer register, so it stays in effect after this
/// command; callers re-set it explicitly.
pub fn text_aligned(side: Alignment, s: &str) -> Command {
    Command::concat([text::align(side), text::raw(s)])
}

/// `count` line feeds.
pub fn new_lines(count: usize) -> Command {
    Command::from(vec![commands::LF; count])
}

/// A single line feed.
pub fn new_line() -> Command {
    new_lines(1)
}

/// Character used to draw a horizontal rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleStyle {
    /// `--------`
    #[default]
    Normal,
    /// `========`
    Double,
    /// `########`
    Hash,
    /// `- - - - -`
    Dashed,
}

impl RuleStyle {
    /// Render the rule as text of at most `width` characters.
    ///
    /// Dashed rules drop their trailing space, so on an even width they are
    /// one character short.
    pub fn render(self, width: usize) -> String {
        match self {
            Self::Normal => "-".repeat(width),
            Self::Double => "=".repeat(width),
            Self::Hash => "#".repeat(width),
            Self::Dashed => {
                let line: String = "- ".chars().cycle().take(width).collect();
                line.trim_end().to_string()
            }
        }
    }
}

/// Width-aware receipt composer.
#[derive(Debug, Clone, Copy, Default)]
pub struct Composer {
    profile: PaperProfile,
}

impl Composer {
    pub fn new(profile: PaperProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &PaperProfile {
        &self.profile
    }

    /// Characters per line for the configured paper.
    pub fn width(&self) -> usize {
        self.profile.chars_per_line
    }

    /// A full-width rule followed by a line feed.
    pub fn horizontal_line(&self, style: RuleStyle) -> Command {
        Command::concat([text::raw(&style.render(self.width())), new_line()])
    }

    /// # Line Item
    ///
    /// Two lines: the item name, then quantity and unit price on the left
    /// with the line total on the right.
    ///
    /// ```text
    /// Latte
    /// 2 x 4.50                    9.00
    /// ```
    ///
    /// At least one space separates the columns; when the content is wider
    /// than the paper the line overflows rather than truncating.
    pub fn line_item(&self, name: &str, quantity: u32, unit_price: f64, total: f64) -> Command {
        let left = format!("{} x {:.2}", quantity, unit_price);
        let right = format!("{:.2}", total);
        let used = char_len(&left) + char_len(&right);
        let padding = self.width().saturating_sub(used).max(1);

        let line = format!("{}{}{}", left, " ".repeat(padding), right);
        Command::concat([text::raw(name), new_line(), text::raw(&line), new_line()])
    }

    /// Justify two columns across the full paper width.
    ///
    /// See [`justify`](Self::justify); uses [`DEFAULT_JUSTIFY_GAP`].
    pub fn justify_line(&self, left: &str, right: &str) -> Command {
        text::raw(&justify(left, right, DEFAULT_JUSTIFY_GAP, self.width()))
    }

    /// Justify with an explicit gap and width, as a command.
    pub fn justify(&self, left: &str, right: &str, gap: usize, width: usize) -> Command {
        text::raw(&justify(left, right, gap, width))
    }

    /// # QR Code
    ///
    /// Centers, then emits the model / module size / error correction
    /// setup, the stored data and the print trigger.
    ///
    /// | Step | Bytes |
    /// |------|-------|
    /// | Center | 1B 61 01 |
    /// | Model 2 | 1D 28 6B 04 00 31 41 32 00 |
    /// | Module size | 1D 28 6B 03 00 31 43 n |
    /// | Error correction L | 1D 28 6B 03 00 31 45 30 |
    /// | Store | 1D 28 6B pL pH 31 50 30 data |
    /// | Print | 1D 28 6B 03 00 31 51 30 |
    ///
    /// `module_size` is not range-checked.
    pub fn qr_code(&self, data: &str, module_size: u8) -> Command {
        Command::concat([
            text::align(Alignment::Center),
            qr::set_model(qr::QrModel::Model2),
            qr::set_module_size(module_size),
            qr::set_error_correction(qr::QrErrorLevel::L),
            qr::store_data(data.as_bytes()),
            qr::print(),
        ])
    }
}

/// Lay out `left` and `right` on one line of exactly `width` characters.
///
/// At least `gap` spaces separate the columns. If they do not fit, `left` is
/// cut and suffixed with [`ELLIPSIS`]. Only when `right` plus the gap is
/// itself wider than `width` does the result overflow.
///
/// ```
/// use boleta::layout::justify;
///
/// let line = justify("Coffee", "$3.50", 1, 32);
/// assert_eq!(line.chars().count(), 32);
/// assert!(line.starts_with("Coffee ") && line.ends_with(" $3.50"));
/// ```
pub fn justify(left: &str, right: &str, gap: usize, width: usize) -> String {
    let right_len = char_len(right);
    let left_room = width.saturating_sub(gap + right_len);
    let left = truncate_with_ellipsis(left, left_room);
    let padding = width
        .saturating_sub(char_len(&left) + right_len)
        .max(gap);

    format!("{}{}{}", left, " ".repeat(padding), right)
}

/// Cut `s` to at most `max` characters, ending in [`ELLIPSIS`] when cut.
pub fn truncate_with_ellipsis(s: &str, max: usize) -> String {
    if char_len(s) <= max {
        return s.to_string();
    }
    let marker = char_len(ELLIPSIS);
    if max <= marker {
        return ELLIPSIS.chars().take(max).collect();
    }
    let mut out: String = s.chars().take(max - marker).collect();
    out.push_str(ELLIPSIS);
    out
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
