//! # Receipt Templates
//!
//! Ready-made receipts built from the [`Composer`], used by the CLI and the
//! HTTP test-print endpoint to check that a printer is wired up correctly.

use chrono::{Local, NaiveDateTime};

use crate::command::Command;
use crate::layout::{self, Composer, RuleStyle};
use crate::protocol::commands::{self, CutType};
use crate::protocol::text::{self, Alignment, TextSize, Underline};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Names accepted by [`by_name`].
pub fn list_receipts() -> &'static [&'static str] {
    &["test", "demo"]
}

pub fn by_name(name: &str, composer: &Composer) -> Option<Command> {
    match name {
        "test" => Some(test_receipt(composer)),
        "demo" => Some(demo_receipt(composer)),
        _ => None,
    }
}

/// Test page stamped with the current local time.
pub fn test_receipt(composer: &Composer) -> Command {
    test_receipt_at(composer, Local::now().naive_local())
}

/// # Test Page
///
/// Exercises every text style, the rules, a line item, a justified total
/// and a QR code, then feeds and cuts.
pub fn test_receipt_at(composer: &Composer, printed_at: NaiveDateTime) -> Command {
    let profile = composer.profile();

    layout::combine([
        commands::init(),
        // Header
        text::align(Alignment::Center),
        text::bold(true),
        text::size(TextSize::DoubleBoth),
        text::raw("TEST PRINT"),
        layout::new_line(),
        text::size(TextSize::Normal),
        text::bold(false),
        text::raw(&printed_at.format(TIMESTAMP_FORMAT).to_string()),
        layout::new_line(),
        text::align(Alignment::Left),
        composer.horizontal_line(RuleStyle::Double),
        // Paper
        composer.justify(
            "Paper",
            &format!("{} / {} cols", profile.name, profile.chars_per_line),
            1,
            composer.width(),
        ),
        layout::new_line(),
        composer.horizontal_line(RuleStyle::Dashed),
        // Styles
        text::bold(true),
        text::raw("Bold"),
        text::bold(false),
        layout::new_line(),
        text::underline(Underline::Single),
        text::raw("Underline"),
        text::underline(Underline::Off),
        layout::new_line(),
        text::reverse(true),
        text::raw(" Reverse "),
        text::reverse(false),
        layout::new_line(),
        text::size(TextSize::DoubleHeight),
        text::raw("Double height"),
        layout::new_line(),
        text::size(TextSize::DoubleWidth),
        text::raw("Wide"),
        layout::new_line(),
        text::size(TextSize::Normal),
        layout::text_aligned(Alignment::Right, "Right"),
        layout::new_line(),
        text::align(Alignment::Left),
        composer.horizontal_line(RuleStyle::Normal),
        // Totals
        composer.line_item("Test item", 1, 0.00, 0.00),
        text::bold(true),
        composer.justify_line("TOTAL", "0.00"),
        text::bold(false),
        layout::new_line(),
        composer.horizontal_line(RuleStyle::Normal),
        layout::new_line(),
        composer.qr_code("https://github.com/boleta-rs/boleta", 6),
        layout::new_line(),
        text::align(Alignment::Left),
        layout::new_lines(3),
        commands::cut(CutType::Partial),
    ])
}

/// A café order, for demos.
pub fn demo_receipt(composer: &Composer) -> Command {
    let items: [(&str, u32, f64); 4] = [
        ("Flat White", 2, 4.50),
        ("Almond Croissant", 1, 3.75),
        ("Sparkling Water", 1, 2.00),
        ("Cinnamon Roll", 3, 3.25),
    ];
    let subtotal: f64 = items.iter().map(|(_, qty, unit)| *qty as f64 * unit).sum();
    let tax = (subtotal * 0.10 * 100.0).round() / 100.0;

    let mut parts = vec![
        commands::init(),
        text::align(Alignment::Center),
        text::bold(true),
        text::size(TextSize::DoubleBoth),
        text::raw("CAFE BOLETA"),
        layout::new_line(),
        text::size(TextSize::Normal),
        text::bold(false),
        text::raw("123 Harbour St"),
        layout::new_line(),
        text::align(Alignment::Left),
        composer.horizontal_line(RuleStyle::Double),
    ];

    for (name, qty, unit) in items {
        parts.push(composer.line_item(name, qty, unit, qty as f64 * unit));
    }

    parts.extend([
        composer.horizontal_line(RuleStyle::Dashed),
        composer.justify_line("Subtotal", &format!("{:.2}", subtotal)),
        layout::new_line(),
        composer.justify_line("Tax 10%", &format!("{:.2}", tax)),
        layout::new_line(),
        text::bold(true),
        composer.justify_line("TOTAL", &format!("{:.2}", subtotal + tax)),
        text::bold(false),
        layout::new_line(),
        composer.horizontal_line(RuleStyle::Normal),
        text::reverse(true),
        layout::text_aligned(Alignment::Center, " THANK YOU "),
        text::reverse(false),
        layout::new_line(),
        text::align(Alignment::Left),
        layout::new_lines(3),
        commands::cut(CutType::Partial),
    ]);

    layout::combine(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::printer::PaperProfile;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn printed_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 20)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .unwrap()
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    #[test]
    fn test_receipt_frame() {
        let receipt = test_receipt_at(&Composer::default(), printed_at());
        let bytes = receipt.as_bytes();

        assert_eq!(&bytes[..2], &[0x1B, 0x40]);
        assert_eq!(&bytes[bytes.len() - 3..], &[0x1D, 0x56, 0x01]);
        assert!(contains(bytes, b"2026-01-20 12:00:00"));
        assert!(contains(bytes, &[0x1D, 0x21, 0x11]));
    }

    #[test]
    fn test_receipt_has_qr() {
        let receipt = test_receipt_at(&Composer::default(), printed_at());
        let bytes = receipt.as_bytes();

        let data = b"https://github.com/boleta-rs/boleta";
        let mut store = vec![0x1D, 0x28, 0x6B, (data.len() + 3) as u8, 0x00, 0x31, 0x50, 0x30];
        store.extend_from_slice(data);
        assert!(contains(bytes, &store));
        assert!(contains(bytes, &[0x1D, 0x28, 0x6B, 0x03, 0x00, 0x31, 0x51, 0x30]));
    }

    #[test]
    fn test_receipt_follows_paper_width() {
        let narrow = test_receipt_at(&Composer::new(PaperProfile::MM58), printed_at());
        let wide = test_receipt_at(&Composer::new(PaperProfile::MM80), printed_at());

        assert!(contains(narrow.as_bytes(), &[b'='; 32]));
        assert!(!contains(narrow.as_bytes(), &[b'='; 33]));
        assert!(contains(wide.as_bytes(), &[b'='; 48]));
    }

    #[test]
    fn test_demo_totals() {
        let receipt = demo_receipt(&Composer::default());
        let text = String::from_utf8_lossy(receipt.as_bytes());

        // 9.00 + 3.75 + 2.00 + 9.75
        assert!(text.contains("Subtotal"));
        assert!(text.contains("24.50"));
        assert!(text.contains("2.45"));
        assert!(text.contains("26.95"));
        assert!(text.contains("2 x 4.50"));
    }

    #[test]
    fn test_by_name() {
        let composer = Composer::default();
        for name in list_receipts() {
            assert!(by_name(name, &composer).is_some(), "missing {}", name);
        }
        assert!(by_name("nope", &composer).is_none());
    }
}
