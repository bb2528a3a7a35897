//! Formula error types

use cellforge_core::CellError;
use thiserror::Error;

/// Result type for formula evaluation
pub type FormulaResult<T> = std::result::Result<T, ExcelError>;

/// Errors produced while evaluating a formula
///
/// Each variant displays as the Excel error string it stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ExcelError {
    /// Division by zero
    #[error("#DIV/0!")]
    DivisionByZero,

    /// Operand or argument of the wrong type
    #[error("#VALUE!")]
    Value,

    /// Numeric argument outside the function's domain
    #[error("#NUM!")]
    Num,

    /// Unrecognised name
    #[error("#NAME?")]
    Name,

    /// The formula depends on its own result
    #[error("#CIRCULAR!")]
    Circular,

    /// An error value already present in the input (`#REF!`, `#N/A`, ...)
    #[error("{0}")]
    Literal(CellError),
}

impl ExcelError {
    /// The cell error value this error is stored as
    pub fn to_cell_error(self) -> CellError {
        match self {
            ExcelError::DivisionByZero => CellError::Div0,
            ExcelError::Value => CellError::Value,
            ExcelError::Num => CellError::Num,
            ExcelError::Name => CellError::Name,
            ExcelError::Circular => CellError::Circular,
            ExcelError::Literal(e) => e,
        }
    }

    /// Display string (`#DIV/0!`, `#VALUE!`, ...)
    pub fn as_str(&self) -> &'static str {
        self.to_cell_error().as_str()
    }
}

impl From<CellError> for ExcelError {
    fn from(e: CellError) -> Self {
        match e {
            CellError::Div0 => ExcelError::DivisionByZero,
            CellError::Value => ExcelError::Value,
            CellError::Num => ExcelError::Num,
            CellError::Name => ExcelError::Name,
            CellError::Circular => ExcelError::Circular,
            other => ExcelError::Literal(other),
        }
    }
}

impl From<ExcelError> for CellError {
    fn from(e: ExcelError) -> Self {
        e.to_cell_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_strings() {
        assert_eq!(ExcelError::DivisionByZero.to_string(), "#DIV/0!");
        assert_eq!(ExcelError::Value.to_string(), "#VALUE!");
        assert_eq!(ExcelError::Num.to_string(), "#NUM!");
        assert_eq!(ExcelError::Name.to_string(), "#NAME?");
        assert_eq!(ExcelError::Circular.to_string(), "#CIRCULAR!");
        assert_eq!(ExcelError::Literal(CellError::Na).to_string(), "#N/A");
    }

    #[test]
    fn test_cell_error_mapping_round_trips() {
        for e in CellError::ALL {
            assert_eq!(ExcelError::from(e).to_cell_error(), e);
        }
    }
}
