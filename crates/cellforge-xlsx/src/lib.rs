//! # cellforge-xlsx
//!
//! XLSX (Office Open XML) reader and writer for cellforge.
//!
//! ```rust
//! use std::io::Cursor;
//! use cellforge_core::{CellValue, Workbook};
//!
//! let mut workbook = Workbook::new();
//! let sheet = workbook.worksheet_mut(0).unwrap();
//! sheet.set_cell_value("A1", 20.0).unwrap();
//! sheet.set_cell_formula("A2", "=A1*2").unwrap();
//!
//! let mut buf = Cursor::new(Vec::new());
//! cellforge_xlsx::write_xlsx(&workbook, &mut buf).unwrap();
//! buf.set_position(0);
//!
//! let read = cellforge_xlsx::read_xlsx(buf).unwrap();
//! let a2 = read.worksheet(0).unwrap().get_value("A2").unwrap();
//! assert_eq!(a2.cached_value(), Some(&CellValue::Number(40.0)));
//! ```

pub mod error;
pub mod reader;
pub mod styles;
pub mod writer;

mod drawing;
mod shared_strings;
mod theme;
mod xml;

pub use error::{XlsxError, XlsxResult};
pub use reader::{read_xlsx, read_xlsx_file, ReaderOptions, XlsxReader};
pub use shared_strings::SharedStringPool;
pub use styles::{CellFormat, StyleTable};
pub use writer::{write_xlsx, write_xlsx_file, WriterOptions, XlsxWriter};
