//! Cell styling types
//!
//! This module contains types for cell formatting:
//! - [`Style`] - Complete cell style
//! - [`Font`] - Font settings
//! - [`Fill`] - Background fill
//! - [`Border`] - Cell borders
//! - [`Color`] - Color description with a canonical RGB form
//!
//! Styles are plain values. Deduplication into numbered tables happens when
//! a workbook is written.

mod border;
mod color;
mod fill;
mod font;

pub use border::{Border, BorderEdge, BorderLineStyle};
pub use color::{canonical_hex, Color};
pub use fill::{Fill, PatternType};
pub use font::Font;

/// Number format code of the default style
pub const GENERAL_FORMAT: &str = "General";

/// Complete cell style
#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    /// Font settings
    pub font: Font,
    /// Fill/background settings
    pub fill: Fill,
    /// Border settings
    pub border: Border,
    /// Number format code (e.g. "0.00%")
    pub number_format: String,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            font: Font::default(),
            fill: Fill::default(),
            border: Border::default(),
            number_format: GENERAL_FORMAT.to_string(),
        }
    }
}

impl Style {
    /// Create a new default style
    pub fn new() -> Self {
        Self::default()
    }

    /// Set font to bold
    pub fn bold(mut self, bold: bool) -> Self {
        self.font.bold = bold;
        self
    }

    /// Set font to italic
    pub fn italic(mut self, italic: bool) -> Self {
        self.font.italic = italic;
        self
    }

    /// Set font size in points
    pub fn font_size(mut self, size: f64) -> Self {
        self.font.size = size;
        self
    }

    /// Set font name
    pub fn font_name<S: Into<String>>(mut self, name: S) -> Self {
        self.font.name = name.into();
        self
    }

    /// Set font color
    pub fn font_color<C: Into<Color>>(mut self, color: C) -> Self {
        self.font.color = color.into();
        self
    }

    /// Set a solid background fill
    pub fn fill_color<C: Into<Color>>(mut self, color: C) -> Self {
        self.fill = Fill::solid(color.into());
        self
    }

    /// Set all borders
    pub fn border_all<C: Into<Color>>(mut self, style: BorderLineStyle, color: C) -> Self {
        self.border = Border::all(style, color.into());
        self
    }

    /// Set the number format code
    pub fn number_format<S: Into<String>>(mut self, code: S) -> Self {
        self.number_format = code.into();
        self
    }

    /// Whether this is the default style
    pub fn is_default(&self) -> bool {
        *self == Style::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_builder() {
        let style = Style::new()
            .bold(true)
            .font_color("red")
            .fill_color("#FFFF00")
            .number_format("0.00");

        assert!(style.font.bold);
        assert_eq!(style.font.color.to_rgb_hex(), "FF0000");
        assert_eq!(style.fill.pattern, PatternType::Solid);
        assert_eq!(style.number_format, "0.00");
        assert!(!style.is_default());
        assert!(Style::new().is_default());
    }

    #[test]
    fn test_border_all() {
        let border = Border::all(BorderLineStyle::Thin, Color::new("blue"));
        assert!(!border.is_empty());
        assert!(Border::new().is_empty());
    }
}
