//! Font style types

use super::Color;

/// Font settings for a cell
#[derive(Debug, Clone, PartialEq)]
pub struct Font {
    /// Font family name
    pub name: String,
    /// Size in points
    pub size: f64,
    pub bold: bool,
    pub italic: bool,
    pub color: Color,
}

impl Font {
    /// Default font family
    pub const DEFAULT_NAME: &'static str = "Calibri";
    /// Default font size in points
    pub const DEFAULT_SIZE: f64 = 11.0;

    /// Create the default font
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for Font {
    fn default() -> Self {
        Self {
            name: Self::DEFAULT_NAME.to_string(),
            size: Self::DEFAULT_SIZE,
            bold: false,
            italic: false,
            color: Color::black(),
        }
    }
}
