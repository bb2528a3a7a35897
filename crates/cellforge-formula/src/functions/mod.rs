//! Built-in Excel functions

pub mod date;
pub mod logical;
pub mod math;
pub mod text;
pub mod trig;

use crate::error::{ExcelError, FormulaResult};
use crate::evaluator::{parse_numeric_text, FormulaValue};
use std::collections::HashMap;

/// Function implementation signature
///
/// Functions are pure: they only see their already-evaluated arguments.
/// Arguments that failed to evaluate arrive as [`FormulaValue::Error`].
pub type FunctionImpl = fn(&[FormulaValue]) -> FormulaResult<FormulaValue>;

/// Function definition
pub struct FunctionDef {
    /// Function name (uppercase)
    pub name: &'static str,
    /// Minimum arguments
    pub min_args: usize,
    /// Maximum arguments (None = unlimited)
    pub max_args: Option<usize>,
    /// Implementation
    pub implementation: FunctionImpl,
}

/// Function registry
pub struct FunctionRegistry {
    functions: HashMap<String, FunctionDef>,
}

impl FunctionRegistry {
    /// Create a new registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self {
            functions: HashMap::new(),
        };

        registry.register_math_functions();
        registry.register_trig_functions();
        registry.register_logical_functions();
        registry.register_text_functions();
        registry.register_date_functions();

        registry
    }

    /// Look up a function by name
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(&name.to_uppercase())
    }

    /// Register a function
    pub fn register(&mut self, def: FunctionDef) {
        self.functions.insert(def.name.to_uppercase(), def);
    }

    /// Names of every registered function, sorted
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.functions.values().map(|f| f.name).collect();
        names.sort_unstable();
        names
    }

    fn add(&mut self, name: &'static str, min_args: usize, max_args: Option<usize>, implementation: FunctionImpl) {
        self.register(FunctionDef {
            name,
            min_args,
            max_args,
            implementation,
        });
    }

    fn register_math_functions(&mut self) {
        self.add("ABS", 1, Some(1), math::fn_abs);
        self.add("SUM", 0, None, math::fn_sum);
        self.add("AVERAGE", 0, None, math::fn_average);
        self.add("COUNT", 0, None, math::fn_count);
        self.add("COUNTA", 0, None, math::fn_counta);
        self.add("MAX", 0, None, math::fn_max);
        self.add("MIN", 0, None, math::fn_min);
        self.add("ROUND", 1, Some(2), math::fn_round);
        self.add("POWER", 2, Some(2), math::fn_power);
        self.add("SQRT", 1, Some(1), math::fn_sqrt);
        self.add("EXP", 1, Some(1), math::fn_exp);
        self.add("LN", 1, Some(1), math::fn_ln);
        self.add("LOG10", 1, Some(1), math::fn_log10);
    }

    fn register_trig_functions(&mut self) {
        self.add("SIN", 1, Some(1), trig::fn_sin);
        self.add("COS", 1, Some(1), trig::fn_cos);
        self.add("TAN", 1, Some(1), trig::fn_tan);
        self.add("PI", 0, Some(0), trig::fn_pi);
    }

    fn register_logical_functions(&mut self) {
        self.add("IF", 2, Some(3), logical::fn_if);
        self.add("AND", 1, None, logical::fn_and);
        self.add("OR", 1, None, logical::fn_or);
        self.add("NOT", 1, Some(1), logical::fn_not);
        self.add("TRUE", 0, Some(0), logical::fn_true);
        self.add("FALSE", 0, Some(0), logical::fn_false);
    }

    fn register_text_functions(&mut self) {
        self.add("CONCATENATE", 1, None, text::fn_concatenate);
        self.add("LEN", 1, Some(1), text::fn_len);
        self.add("LEFT", 1, Some(2), text::fn_left);
        self.add("RIGHT", 1, Some(2), text::fn_right);
        self.add("MID", 3, Some(3), text::fn_mid);
        self.add("UPPER", 1, Some(1), text::fn_upper);
        self.add("LOWER", 1, Some(1), text::fn_lower);
        self.add("TRIM", 1, Some(1), text::fn_trim);
    }

    fn register_date_functions(&mut self) {
        self.add("TODAY", 0, Some(0), date::fn_today);
        self.add("NOW", 0, Some(0), date::fn_now);
        self.add("YEAR", 1, Some(1), date::fn_year);
        self.add("MONTH", 1, Some(1), date::fn_month);
        self.add("DAY", 1, Some(1), date::fn_day);
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Numbers taken from aggregate arguments (SUM, AVERAGE, COUNT, MAX, MIN)
///
/// Direct arguments count when they are numbers, logicals or numeric text.
/// Inside ranges only real numbers count. Empty values and other text are
/// skipped; any error value aborts with that error.
pub(crate) fn collect_numbers(args: &[FormulaValue]) -> FormulaResult<Vec<f64>> {
    let mut numbers = Vec::new();
    for arg in args {
        match arg {
            FormulaValue::Number(n) => numbers.push(*n),
            FormulaValue::Boolean(b) => numbers.push(if *b { 1.0 } else { 0.0 }),
            FormulaValue::Text(s) => numbers.extend(parse_numeric_text(s)),
            FormulaValue::Error(e) => return Err((*e).into()),
            FormulaValue::Array(items) => collect_array_numbers(items, &mut numbers)?,
            FormulaValue::Empty => {}
        }
    }
    Ok(numbers)
}

fn collect_array_numbers(items: &[FormulaValue], numbers: &mut Vec<f64>) -> FormulaResult<()> {
    for item in items {
        match item {
            FormulaValue::Number(n) => numbers.push(*n),
            FormulaValue::Error(e) => return Err((*e).into()),
            FormulaValue::Array(nested) => collect_array_numbers(nested, numbers)?,
            _ => {}
        }
    }
    Ok(())
}

/// Flatten arguments, expanding arrays in place
pub(crate) fn flatten(args: &[FormulaValue]) -> Vec<&FormulaValue> {
    let mut out = Vec::new();
    for arg in args {
        match arg {
            FormulaValue::Array(items) => out.extend(flatten(items)),
            other => out.push(other),
        }
    }
    out
}

/// Argument `index` coerced to a number, or `default` when absent
pub(crate) fn number_arg(args: &[FormulaValue], index: usize, default: f64) -> FormulaResult<f64> {
    match args.get(index) {
        Some(v) => v.to_number(),
        None => Ok(default),
    }
}

/// Argument `index` coerced to text
pub(crate) fn text_arg(args: &[FormulaValue], index: usize) -> FormulaResult<String> {
    args.get(index).ok_or(ExcelError::Value)?.to_text()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellforge_core::CellError;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = FunctionRegistry::new();
        assert!(registry.get("sum").is_some());
        assert!(registry.get("Sum").is_some());
        assert!(registry.get("VLOOKUP").is_none());
        assert_eq!(registry.names().len(), 36);
    }

    #[test]
    fn test_collect_numbers() {
        let args = vec![
            FormulaValue::Number(1.0),
            FormulaValue::Boolean(true),
            FormulaValue::Text("2".into()),
            FormulaValue::Text("x".into()),
            FormulaValue::Array(vec![
                FormulaValue::Number(3.0),
                FormulaValue::Boolean(true),
                FormulaValue::Text("4".into()),
                FormulaValue::Empty,
            ]),
        ];
        assert_eq!(collect_numbers(&args), Ok(vec![1.0, 1.0, 2.0, 3.0]));

        let with_error = vec![FormulaValue::Array(vec![FormulaValue::Error(CellError::Na)])];
        assert_eq!(
            collect_numbers(&with_error),
            Err(ExcelError::Literal(CellError::Na))
        );
    }
}
