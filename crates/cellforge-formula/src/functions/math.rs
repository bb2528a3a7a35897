//! Math functions

use super::{collect_numbers, flatten, number_arg};
use crate::error::{ExcelError, FormulaResult};
use crate::evaluator::FormulaValue;

fn finite(n: f64) -> FormulaResult<FormulaValue> {
    if n.is_finite() {
        Ok(FormulaValue::Number(n))
    } else {
        Err(ExcelError::Num)
    }
}

/// `base ^ exponent`, shared by the `^` operator and POWER
///
/// An infinite result from a zero base is a division by zero; any other
/// non-finite result is out of range.
pub(crate) fn power(base: f64, exponent: f64) -> FormulaResult<f64> {
    let result = base.powf(exponent);
    if result.is_finite() {
        Ok(result)
    } else if base == 0.0 {
        Err(ExcelError::DivisionByZero)
    } else {
        Err(ExcelError::Num)
    }
}

/// ABS function
pub fn fn_abs(args: &[FormulaValue]) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(number_arg(args, 0, 0.0)?.abs()))
}

/// SUM function
pub fn fn_sum(args: &[FormulaValue]) -> FormulaResult<FormulaValue> {
    finite(collect_numbers(args)?.iter().sum())
}

/// AVERAGE function
pub fn fn_average(args: &[FormulaValue]) -> FormulaResult<FormulaValue> {
    let numbers = collect_numbers(args)?;
    if numbers.is_empty() {
        return Err(ExcelError::DivisionByZero);
    }
    finite(numbers.iter().sum::<f64>() / numbers.len() as f64)
}

/// COUNT function
pub fn fn_count(args: &[FormulaValue]) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(collect_numbers(args)?.len() as f64))
}

/// COUNTA function: non-empty values, including errors
pub fn fn_counta(args: &[FormulaValue]) -> FormulaResult<FormulaValue> {
    let count = flatten(args)
        .into_iter()
        .filter(|v| match v {
            FormulaValue::Empty => false,
            FormulaValue::Text(s) => !s.is_empty(),
            _ => true,
        })
        .count();
    Ok(FormulaValue::Number(count as f64))
}

/// MAX function (0 when there is nothing to compare)
pub fn fn_max(args: &[FormulaValue]) -> FormulaResult<FormulaValue> {
    let max = collect_numbers(args)?.into_iter().reduce(f64::max);
    Ok(FormulaValue::Number(max.unwrap_or(0.0)))
}

/// MIN function (0 when there is nothing to compare)
pub fn fn_min(args: &[FormulaValue]) -> FormulaResult<FormulaValue> {
    let min = collect_numbers(args)?.into_iter().reduce(f64::min);
    Ok(FormulaValue::Number(min.unwrap_or(0.0)))
}

/// ROUND function: half away from zero, digits default to 0
pub fn fn_round(args: &[FormulaValue]) -> FormulaResult<FormulaValue> {
    let n = number_arg(args, 0, 0.0)?;
    let digits = number_arg(args, 1, 0.0)?.trunc().clamp(-308.0, 308.0) as i32;
    let factor = 10f64.powi(digits.abs());
    if digits >= 0 {
        finite((n * factor).round() / factor)
    } else {
        finite((n / factor).round() * factor)
    }
}

/// POWER function
pub fn fn_power(args: &[FormulaValue]) -> FormulaResult<FormulaValue> {
    let base = number_arg(args, 0, 0.0)?;
    let exponent = number_arg(args, 1, 0.0)?;
    Ok(FormulaValue::Number(power(base, exponent)?))
}

/// SQRT function
pub fn fn_sqrt(args: &[FormulaValue]) -> FormulaResult<FormulaValue> {
    let n = number_arg(args, 0, 0.0)?;
    if n < 0.0 {
        return Err(ExcelError::Num);
    }
    Ok(FormulaValue::Number(n.sqrt()))
}

/// EXP function
pub fn fn_exp(args: &[FormulaValue]) -> FormulaResult<FormulaValue> {
    finite(number_arg(args, 0, 0.0)?.exp())
}

/// LN function
pub fn fn_ln(args: &[FormulaValue]) -> FormulaResult<FormulaValue> {
    let n = number_arg(args, 0, 0.0)?;
    if n <= 0.0 {
        return Err(ExcelError::Num);
    }
    Ok(FormulaValue::Number(n.ln()))
}

/// LOG10 function
pub fn fn_log10(args: &[FormulaValue]) -> FormulaResult<FormulaValue> {
    let n = number_arg(args, 0, 0.0)?;
    if n <= 0.0 {
        return Err(ExcelError::Num);
    }
    Ok(FormulaValue::Number(n.log10()))
}
