//! Logical functions

use super::flatten;
use crate::error::{ExcelError, FormulaResult};
use crate::evaluator::FormulaValue;

/// IF function
///
/// The else branch defaults to FALSE. A condition that cannot be read as a
/// logical selects the else branch; an error condition propagates.
pub fn fn_if(args: &[FormulaValue]) -> FormulaResult<FormulaValue> {
    let condition = args.first().ok_or(ExcelError::Value)?;
    if let Some(e) = condition.get_error() {
        return Err(e.into());
    }

    let else_value = || args.get(2).cloned().unwrap_or(FormulaValue::Boolean(false));
    match condition.to_bool() {
        Ok(true) => Ok(args.get(1).cloned().unwrap_or(FormulaValue::Boolean(true))),
        Ok(false) | Err(_) => Ok(else_value()),
    }
}

/// Logical values among the arguments, with arrays flattened
///
/// Empty values and text that is not TRUE/FALSE are skipped.
fn collect_logicals(args: &[FormulaValue]) -> FormulaResult<Vec<bool>> {
    let mut out = Vec::new();
    for value in flatten(args) {
        match value {
            FormulaValue::Error(e) => return Err((*e).into()),
            FormulaValue::Empty => {}
            FormulaValue::Text(_) => {
                if let Ok(b) = value.to_bool() {
                    out.push(b);
                }
            }
            other => out.push(other.to_bool()?),
        }
    }
    Ok(out)
}

/// AND function
pub fn fn_and(args: &[FormulaValue]) -> FormulaResult<FormulaValue> {
    let values = collect_logicals(args)?;
    if values.is_empty() {
        return Err(ExcelError::Value);
    }
    Ok(FormulaValue::Boolean(values.into_iter().all(|b| b)))
}

/// OR function
pub fn fn_or(args: &[FormulaValue]) -> FormulaResult<FormulaValue> {
    let values = collect_logicals(args)?;
    if values.is_empty() {
        return Err(ExcelError::Value);
    }
    Ok(FormulaValue::Boolean(values.into_iter().any(|b| b)))
}

/// NOT function
pub fn fn_not(args: &[FormulaValue]) -> FormulaResult<FormulaValue> {
    let value = args.first().ok_or(ExcelError::Value)?;
    Ok(FormulaValue::Boolean(!value.to_bool()?))
}

/// TRUE function
pub fn fn_true(_args: &[FormulaValue]) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Boolean(true))
}

/// FALSE function
pub fn fn_false(_args: &[FormulaValue]) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Boolean(false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluate;
    use pretty_assertions::assert_eq;

    fn boolean(b: bool) -> FormulaResult<FormulaValue> {
        Ok(FormulaValue::Boolean(b))
    }

    #[test]
    fn test_if() {
        assert_eq!(
            evaluate("=IF(1>0,\"yes\",\"no\")"),
            Ok(FormulaValue::Text("yes".into()))
        );
        assert_eq!(evaluate("=IF(0,\"yes\",\"no\")"), Ok(FormulaValue::Text("no".into())));
        assert_eq!(evaluate("=IF(FALSE,1)"), boolean(false));
        assert_eq!(evaluate("=IF(\"maybe\",1,2)"), Ok(FormulaValue::Number(2.0)));
        assert_eq!(evaluate("=IF(1/0,1,2)"), Err(ExcelError::DivisionByZero));
    }

    #[test]
    fn test_and_or_not() {
        assert_eq!(evaluate("=AND(TRUE,1,\"true\")"), boolean(true));
        assert_eq!(evaluate("=AND(TRUE,0)"), boolean(false));
        assert_eq!(evaluate("=OR(FALSE,0,2)"), boolean(true));
        assert_eq!(evaluate("=OR(\"abc\")"), Err(ExcelError::Value));
        assert_eq!(evaluate("=NOT(TRUE)"), boolean(false));
        assert_eq!(evaluate("=NOT(0)"), boolean(true));
        assert_eq!(evaluate("=TRUE()"), boolean(true));
        assert_eq!(evaluate("=FALSE()"), boolean(false));
    }
}
