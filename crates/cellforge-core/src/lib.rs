//! # cellforge-core
//!
//! Core data structures for the cellforge spreadsheet engine.
//!
//! This crate provides the grid model consumed by the formula evaluator and
//! the XLSX codec:
//! - [`CellValue`] and [`CellKind`] - Cell values and their runtime kind tag
//! - [`CellReference`] and [`CellRange`] - 1-based A1-style addressing
//! - [`Style`] - Font, fill, border and number format of a cell
//! - [`Image`] and [`Anchor`] - Embedded raster images and their placement
//! - [`Workbook`], [`Worksheet`] - The document structures
//!
//! ## Example
//!
//! ```rust
//! use cellforge_core::{CellValue, Workbook};
//!
//! let mut workbook = Workbook::new();
//! let sheet = workbook.worksheet_mut(0).unwrap();
//!
//! sheet.set_cell_value("A1", "Total").unwrap();
//! sheet.set_cell_value("B1", 42.0).unwrap();
//! sheet.set_cell_formula("C1", "=B1*2").unwrap();
//!
//! // Rows and columns are 1-based, like the A1 notation they come from
//! sheet.set_cell_value_at(2, 1, CellValue::Boolean(true)).unwrap();
//! assert_eq!(sheet.get_value("B1").unwrap(), &CellValue::Number(42.0));
//! ```

pub mod cell;
pub mod drawing;
pub mod error;
pub mod style;
pub mod workbook;
pub mod worksheet;

pub use cell::{CellData, CellError, CellKind, CellRange, CellReference, CellValue};
pub use drawing::{emu_to_px, px_to_emu, Anchor, Image, ImageCollection, ImageFormat, EMU_PER_PIXEL};
pub use error::{Error, Result};
pub use style::{Border, BorderEdge, BorderLineStyle, Color, Fill, Font, PatternType, Style};
pub use workbook::{DocumentProperties, Workbook};
pub use worksheet::Worksheet;

/// Maximum number of rows in a worksheet (Excel limit)
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet (Excel limit)
pub const MAX_COLS: u32 = 16_384;

/// Maximum length of a sheet name
pub const MAX_SHEET_NAME_LEN: usize = 31;
