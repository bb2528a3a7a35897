//! # cellforge-formula
//!
//! Formula lexer and evaluator for cellforge.
//!
//! This crate provides:
//! - Formula tokenizing (text → typed tokens)
//! - Formula evaluation straight from the token stream
//! - Built-in Excel functions (math, trig, logical, text, date)
//! - Circular reference detection across formula cells
//!
//! ## Example
//!
//! ```rust
//! use cellforge_core::{CellReference, Worksheet};
//! use cellforge_formula::{Evaluator, FormulaValue};
//!
//! let mut sheet = Worksheet::new("Sheet1");
//! sheet.set_cell_value("A1", 20.0).unwrap();
//! sheet.set_cell_formula("A2", "=A1*2+SUM(1,2)").unwrap();
//!
//! let cell = CellReference::parse("A2").unwrap();
//! let value = Evaluator::new(&sheet).evaluate_cell(cell).unwrap();
//! assert_eq!(value, FormulaValue::Number(43.0));
//! ```

pub mod error;
pub mod evaluator;
pub mod functions;
pub mod lexer;

pub use error::{ExcelError, FormulaResult};
pub use evaluator::{
    evaluate, format_number, CellGrid, EmptyGrid, EvaluationContext, Evaluator, FormulaValue,
};
pub use functions::{FunctionDef, FunctionRegistry};
pub use lexer::{tokenize, Token, TokenKind};
