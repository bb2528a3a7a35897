//! Trigonometric functions (radians)

use super::number_arg;
use crate::error::{ExcelError, FormulaResult};
use crate::evaluator::FormulaValue;

fn unary(args: &[FormulaValue], f: fn(f64) -> f64) -> FormulaResult<FormulaValue> {
    let result = f(number_arg(args, 0, 0.0)?);
    if result.is_finite() {
        Ok(FormulaValue::Number(result))
    } else {
        Err(ExcelError::Num)
    }
}

/// SIN function
pub fn fn_sin(args: &[FormulaValue]) -> FormulaResult<FormulaValue> {
    unary(args, f64::sin)
}

/// COS function
pub fn fn_cos(args: &[FormulaValue]) -> FormulaResult<FormulaValue> {
    unary(args, f64::cos)
}

/// TAN function
pub fn fn_tan(args: &[FormulaValue]) -> FormulaResult<FormulaValue> {
    unary(args, f64::tan)
}

/// PI function
pub fn fn_pi(_args: &[FormulaValue]) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(std::f64::consts::PI))
}
