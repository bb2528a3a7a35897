//! # cellforge
//!
//! A Rust library for evaluating Excel-style formulas and reading and writing
//! XLSX workbooks.
//!
//! ## Features
//!
//! - Formula evaluation over a live grid of cells, with circular reference
//!   detection
//! - Read and write XLSX files (Office Open XML)
//! - Cell styling with deduplicated style tables
//! - Embedded PNG, JPEG and GIF images anchored to cells
//!
//! ## Example
//!
//! ```rust
//! use cellforge::prelude::*;
//!
//! // Create a new workbook
//! let mut workbook = Workbook::new();
//!
//! // Get the first worksheet
//! let sheet = workbook.worksheet_mut(0).unwrap();
//!
//! // Set cell values
//! sheet.set_cell_value("A1", "Hello").unwrap();
//! sheet.set_cell_value("B1", 42.0).unwrap();
//! sheet.set_cell_value("C1", true).unwrap();
//!
//! // Set a formula
//! sheet.set_cell_formula("D1", "=B1*2").unwrap();
//!
//! // Save to file
//! // workbook.save("output.xlsx").unwrap();
//! ```

pub mod calculation;
pub mod prelude;

use std::path::Path;

use thiserror::Error;

// Re-export calculation types
pub use calculation::{
    calculate_sheet, CalculationOptions, CalculationStats, WorkbookCalculationExt,
};

// Re-export core types
pub use cellforge_core::{
    // Drawing types
    emu_to_px,
    px_to_emu,
    Anchor,
    // Style types
    Border,
    BorderEdge,
    BorderLineStyle,
    // Cell types
    CellData,
    CellError,
    CellKind,
    CellRange,
    CellReference,
    CellValue,
    Color,
    DocumentProperties,
    Fill,
    Font,
    Image,
    ImageCollection,
    ImageFormat,
    PatternType,
    Style,
    // Main types
    Workbook,
    Worksheet,

    // Constants
    EMU_PER_PIXEL,
    MAX_COLS,
    MAX_ROWS,
    MAX_SHEET_NAME_LEN,
};

/// Error type of the core object model
pub use cellforge_core::Error as CoreError;

// Re-export formula types
pub use cellforge_formula::{
    evaluate, tokenize, CellGrid, EvaluationContext, Evaluator, ExcelError, FormulaResult,
    FormulaValue, Token, TokenKind,
};

// Re-export I/O types
pub use cellforge_xlsx::{
    read_xlsx, read_xlsx_file, write_xlsx, write_xlsx_file, ReaderOptions, StyleTable,
    XlsxError, XlsxReader, XlsxWriter, WriterOptions,
};

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the cellforge facade
#[derive(Debug, Error)]
pub enum Error {
    /// Object model error (bad address, duplicate sheet name, ...)
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Formula evaluation error
    #[error("Formula error: {0}")]
    Formula(#[from] ExcelError),

    /// XLSX read or write error
    #[error(transparent)]
    Xlsx(#[from] XlsxError),

    /// The file extension does not name a supported format
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),
}

/// Extension trait for Workbook to add file I/O
pub trait WorkbookExt {
    /// Open a workbook from a file
    fn open<P: AsRef<Path>>(path: P) -> Result<Workbook>;

    /// Save the workbook to a file
    fn save<P: AsRef<Path>>(&self, path: P) -> Result<()>;
}

impl WorkbookExt for Workbook {
    fn open<P: AsRef<Path>>(path: P) -> Result<Workbook> {
        let path = path.as_ref();
        match extension(path).as_deref() {
            Some("xlsx") | Some("xlsm") => Ok(read_xlsx_file(path)?),
            _ => Err(Error::UnsupportedFormat(path.display().to_string())),
        }
    }

    fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        match extension(path).as_deref() {
            Some("xlsx") => Ok(write_xlsx_file(self, path)?),
            _ => Err(Error::UnsupportedFormat(path.display().to_string())),
        }
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// Evaluate `formula` against `sheet`, as if it were stored at `address`
///
/// `address` only matters for circular reference detection; pass `None` to
/// evaluate a free-standing formula.
///
/// ```rust
/// use cellforge::{evaluate_at, FormulaValue, Worksheet};
///
/// let mut sheet = Worksheet::new("Sheet1");
/// sheet.set_cell_value("A1", 4.0).unwrap();
/// assert_eq!(
///     evaluate_at(&sheet, "=A1^2", None).unwrap(),
///     FormulaValue::Number(16.0)
/// );
/// ```
pub fn evaluate_at(sheet: &Worksheet, formula: &str, address: Option<&str>) -> Result<FormulaValue> {
    let origin = address.map(CellReference::parse).transpose()?;
    Ok(Evaluator::new(sheet).evaluate(formula, origin)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_extension() {
        let workbook = Workbook::new();
        assert!(matches!(
            workbook.save("out.csv"),
            Err(Error::UnsupportedFormat(_))
        ));
        assert!(matches!(
            Workbook::open("in.xls"),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_evaluate_at() {
        let mut sheet = Worksheet::new("Sheet1");
        sheet.set_cell_formula("A1", "=A2").unwrap();
        sheet.set_cell_formula("A2", "=A1").unwrap();

        assert!(matches!(
            evaluate_at(&sheet, "=A1", Some("B1")),
            Err(Error::Formula(ExcelError::Circular))
        ));
        assert!(matches!(
            evaluate_at(&sheet, "=1", Some("not a cell")),
            Err(Error::Core(_))
        ));
        assert!(matches!(
            evaluate_at(&sheet, "=5/0", None),
            Err(Error::Formula(ExcelError::DivisionByZero))
        ));
    }
}
