//! Per-cell storage record

use super::CellValue;
use crate::style::Style;

/// Everything stored for one cell: value, style and hyperlink
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CellData {
    /// The cell's value
    pub value: CellValue,
    /// Explicit style (`None` = workbook default)
    pub style: Option<Style>,
    /// Hyperlink target URL
    pub hyperlink: Option<String>,
}

impl CellData {
    /// Create a new cell with a value and default style
    pub fn new(value: CellValue) -> Self {
        Self {
            value,
            style: None,
            hyperlink: None,
        }
    }

    /// Create a new cell with a value and style
    pub fn with_style(value: CellValue, style: Style) -> Self {
        Self {
            value,
            style: Some(style),
            hyperlink: None,
        }
    }

    /// Check if this cell carries nothing worth storing
    pub fn is_empty(&self) -> bool {
        self.value.is_empty() && self.style.is_none() && self.hyperlink.is_none()
    }
}
