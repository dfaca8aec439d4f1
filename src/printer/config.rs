//! # Paper Configuration
//!
//! This module defines the paper profiles used to lay out receipts.
//!
//! ## Supported Profiles
//!
//! | Profile | Width (dots) | Columns (Font A) | Resolution |
//! |---------|--------------|------------------|------------|
//! | 58mm | 384 | 32 | 203 DPI |
//! | 80mm | 576 | 48 | 203 DPI |
//!
//! ## Usage
//!
//! ```
//! use boleta::printer::PaperProfile;
//!
//! let profile = PaperProfile::MM58;
//! println!("Print width: {} dots ({} columns)",
//!          profile.width_dots,
//!          profile.chars_per_line);
//! ```

use serde::Serialize;

use crate::error::BoletaError;

/// # Paper Profile
///
/// Physical paper characteristics that drive text layout.
///
/// `chars_per_line` is configuration, not something queried from the
/// printer: a 12-dot Font A glyph gives 384 / 12 = 32 columns on 58 mm
/// paper and 576 / 12 = 48 on 80 mm paper.
///
/// ## Calculations
///
/// ```text
/// dots_per_mm = dpi / 25.4
/// width_mm = width_dots / dots_per_mm
///
/// For 58mm paper:
///   dots_per_mm = 203 / 25.4 ≈ 8
///   width_mm = 384 / 8 = 48mm printable
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaperProfile {
    /// Profile name
    pub name: &'static str,

    /// Printable width in dots
    pub width_dots: u16,

    /// Characters per line in the default font
    pub chars_per_line: usize,

    /// Resolution in dots per inch
    pub dpi: u16,
}

impl PaperProfile {
    /// # 58mm Paper
    ///
    /// The common size for handheld Bluetooth receipt printers.
    ///
    /// ```text
    /// ├─ 5mm ─┼──── 48mm printable ────┼─ 5mm ─┤
    /// │margin │        384 dots        │margin │
    /// ```
    pub const MM58: Self = Self {
        name: "58mm",
        width_dots: 384,
        chars_per_line: 32,
        dpi: 203,
    };

    /// # 80mm Paper
    ///
    /// Desktop receipt printers.
    pub const MM80: Self = Self {
        name: "80mm",
        width_dots: 576,
        chars_per_line: 48,
        dpi: 203,
    };

    /// Calculate dots per millimeter
    ///
    /// ## Example
    ///
    /// ```
    /// use boleta::printer::PaperProfile;
    ///
    /// let profile = PaperProfile::MM58;
    /// assert!((profile.dots_per_mm() - 8.0).abs() < 0.1);
    /// ```
    #[inline]
    pub fn dots_per_mm(&self) -> f32 {
        self.dpi as f32 / 25.4
    }

    /// Calculate print width in millimeters
    #[inline]
    pub fn width_mm(&self) -> f32 {
        self.width_dots as f32 / self.dots_per_mm()
    }

    /// Parse a profile name (CLI args or config).
    ///
    /// Accepts `"58"`, `"58mm"`, `"80"`, `"80mm"` (case-insensitive).
    pub fn parse(s: &str) -> Result<Self, BoletaError> {
        match s.trim().to_lowercase().as_str() {
            "58" | "58mm" => Ok(Self::MM58),
            "80" | "80mm" => Ok(Self::MM80),
            other => {
                let names: Vec<&str> = Self::built_in().iter().map(|p| p.name).collect();
                Err(BoletaError::InvalidConfig(format!(
                    "Unknown paper profile '{}'. Available: {}",
                    other,
                    names.join(", ")
                )))
            }
        }
    }

    /// List all built-in profiles.
    pub fn built_in() -> [Self; 2] {
        [Self::MM58, Self::MM80]
    }
}

impl Default for PaperProfile {
    fn default() -> Self {
        Self::MM58
    }
}

// ============================================================================
// TESTS
// ============================================================================
