//! Prelude module - common imports for cellforge users
//!
//! ```rust
//! use cellforge::prelude::*;
//! ```

pub use crate::{
    // Drawing types
    Anchor,
    // Style types
    Border,
    BorderEdge,
    BorderLineStyle,
    // Calculation types
    CalculationOptions,
    CalculationStats,
    // Cell types
    CellError,
    CellRange,
    CellReference,
    CellValue,
    Color,
    // Error types
    Error,
    Fill,
    Font,
    FormulaValue,
    Image,
    ImageFormat,
    Result,
    Style,
    // Main types
    Workbook,
    // Extension traits
    WorkbookCalculationExt,
    WorkbookExt,
    Worksheet,

    // I/O types
    XlsxReader,
    XlsxWriter,
};
