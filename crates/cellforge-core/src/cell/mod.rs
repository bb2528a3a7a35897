//! Cell-related types
//!
//! This module contains:
//! - [`CellValue`] - The value stored in a cell, with its [`CellKind`] tag
//! - [`CellReference`] - A cell's location (e.g., "A1")
//! - [`CellRange`] - A range of cells (e.g., "A1:B10")
//! - [`CellData`] - Complete cell data including value, style and hyperlink

mod data;
mod reference;
mod value;

pub use data::CellData;
pub use reference::{CellRange, CellRangeIter, CellReference};
pub use value::{CellError, CellKind, CellValue};
