//! Text functions
//!
//! Positions and lengths count characters, not bytes.

use super::{number_arg, text_arg};
use crate::error::{ExcelError, FormulaResult};
use crate::evaluator::FormulaValue;

/// Character count argument; negative counts are rejected
fn count_arg(args: &[FormulaValue], index: usize, default: f64) -> FormulaResult<usize> {
    let n = number_arg(args, index, default)?.trunc();
    if n < 0.0 {
        return Err(ExcelError::Value);
    }
    Ok(n as usize)
}

/// CONCATENATE function
pub fn fn_concatenate(args: &[FormulaValue]) -> FormulaResult<FormulaValue> {
    let mut result = String::new();
    for arg in args {
        result.push_str(&arg.to_text()?);
    }
    Ok(FormulaValue::Text(result))
}

/// LEN function
pub fn fn_len(args: &[FormulaValue]) -> FormulaResult<FormulaValue> {
    let text = text_arg(args, 0)?;
    Ok(FormulaValue::Number(text.chars().count() as f64))
}

/// LEFT function (one character by default)
pub fn fn_left(args: &[FormulaValue]) -> FormulaResult<FormulaValue> {
    let text = text_arg(args, 0)?;
    let n = count_arg(args, 1, 1.0)?;
    Ok(FormulaValue::Text(text.chars().take(n).collect()))
}

/// RIGHT function (one character by default)
pub fn fn_right(args: &[FormulaValue]) -> FormulaResult<FormulaValue> {
    let text = text_arg(args, 0)?;
    let n = count_arg(args, 1, 1.0)?;
    let len = text.chars().count();
    Ok(FormulaValue::Text(text.chars().skip(len.saturating_sub(n)).collect()))
}

/// MID function (1-based start)
pub fn fn_mid(args: &[FormulaValue]) -> FormulaResult<FormulaValue> {
    let text = text_arg(args, 0)?;
    let start = number_arg(args, 1, 1.0)?.trunc();
    if start < 1.0 {
        return Err(ExcelError::Value);
    }
    let len = count_arg(args, 2, 0.0)?;
    Ok(FormulaValue::Text(
        text.chars().skip(start as usize - 1).take(len).collect(),
    ))
}

/// UPPER function
pub fn fn_upper(args: &[FormulaValue]) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Text(text_arg(args, 0)?.to_uppercase()))
}

/// LOWER function
pub fn fn_lower(args: &[FormulaValue]) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Text(text_arg(args, 0)?.to_lowercase()))
}

/// TRIM function: strips the ends and collapses inner runs of whitespace
pub fn fn_trim(args: &[FormulaValue]) -> FormulaResult<FormulaValue> {
    let text = text_arg(args, 0)?;
    Ok(FormulaValue::Text(
        text.split_whitespace().collect::<Vec<_>>().join(" "),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluate;
    use pretty_assertions::assert_eq;

    fn text(s: &str) -> FormulaResult<FormulaValue> {
        Ok(FormulaValue::Text(s.to_string()))
    }

    #[test]
    fn test_concatenate() {
        assert_eq!(evaluate("=CONCATENATE(\"a\",1,TRUE)"), text("a1TRUE"));
        assert_eq!(evaluate("=CONCATENATE(\"x\",1/0)"), Err(ExcelError::DivisionByZero));
    }

    #[test]
    fn test_len_counts_characters() {
        assert_eq!(evaluate("=LEN(\"héllo\")"), Ok(FormulaValue::Number(5.0)));
        assert_eq!(evaluate("=LEN(12.5)"), Ok(FormulaValue::Number(4.0)));
    }

    #[test]
    fn test_left_right_mid() {
        assert_eq!(evaluate("=LEFT(\"Hello\")"), text("H"));
        assert_eq!(evaluate("=LEFT(\"Hello\",3)"), text("Hel"));
        assert_eq!(evaluate("=RIGHT(\"Hello\",2)"), text("lo"));
        assert_eq!(evaluate("=RIGHT(\"Hi\",10)"), text("Hi"));
        assert_eq!(evaluate("=MID(\"Hello\",2,3)"), text("ell"));
        assert_eq!(evaluate("=MID(\"Hello\",9,3)"), text(""));
        assert_eq!(evaluate("=MID(\"Hello\",0,3)"), Err(ExcelError::Value));
        assert_eq!(evaluate("=LEFT(\"Hello\",-1)"), Err(ExcelError::Value));
    }

    #[test]
    fn test_case_and_trim() {
        assert_eq!(evaluate("=UPPER(\"abc\")"), text("ABC"));
        assert_eq!(evaluate("=LOWER(\"ABC\")"), text("abc"));
        assert_eq!(evaluate("=TRIM(\"  a   b  \")"), text("a b"));
    }
}
