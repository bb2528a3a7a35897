//! Cell value types

use std::fmt;

/// Runtime kind of a cell value
///
/// Decided once when the value is stored, so consumers can match on the tag
/// instead of probing the value again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellKind {
    Empty,
    Number,
    Text,
    Boolean,
    Error,
    Formula,
}

/// Represents the value stored in a cell
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    /// Empty cell (no value)
    #[default]
    Empty,

    /// Numeric value (all numbers stored as f64, including date serials)
    Number(f64),

    /// Literal text
    Text(String),

    /// Boolean value (TRUE/FALSE)
    Boolean(bool),

    /// Error value (#VALUE!, #REF!, etc.)
    Error(CellError),

    /// Formula with an optional cached result
    Formula {
        /// Formula text, always starting with `=`
        text: String,
        /// Last calculated value (if any)
        cached: Option<Box<CellValue>>,
    },
}

impl CellValue {
    /// Create a new text value
    pub fn text<S: Into<String>>(s: S) -> Self {
        CellValue::Text(s.into())
    }

    /// Create a new formula value without a cached result
    ///
    /// A missing leading `=` is added, so `"B1*2"` and `"=B1*2"` store the same text.
    pub fn formula<S: Into<String>>(text: S) -> Self {
        let text = text.into();
        let text = if text.starts_with('=') {
            text
        } else {
            format!("={}", text)
        };
        CellValue::Formula { text, cached: None }
    }

    /// Create a formula value carrying a cached result
    pub fn formula_with_cached<S: Into<String>>(text: S, cached: CellValue) -> Self {
        match Self::formula(text) {
            CellValue::Formula { text, .. } => CellValue::Formula {
                text,
                cached: Some(Box::new(cached)),
            },
            other => other,
        }
    }

    /// The runtime kind tag of this value
    pub fn kind(&self) -> CellKind {
        match self {
            CellValue::Empty => CellKind::Empty,
            CellValue::Number(_) => CellKind::Number,
            CellValue::Text(_) => CellKind::Text,
            CellValue::Boolean(_) => CellKind::Boolean,
            CellValue::Error(_) => CellKind::Error,
            CellValue::Formula { .. } => CellKind::Formula,
        }
    }

    /// Check if the cell is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Check if the cell contains a formula
    pub fn is_formula(&self) -> bool {
        matches!(self, CellValue::Formula { .. })
    }

    /// Try to get the value as a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            CellValue::Formula {
                cached: Some(v), ..
            } => v.as_number(),
            _ => None,
        }
    }

    /// Try to get the value as text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            CellValue::Formula {
                cached: Some(v), ..
            } => v.as_text(),
            _ => None,
        }
    }

    /// Get the formula text if this is a formula cell
    pub fn formula_text(&self) -> Option<&str> {
        match self {
            CellValue::Formula { text, .. } => Some(text),
            _ => None,
        }
    }

    /// Get the cached result of a formula cell
    pub fn cached_value(&self) -> Option<&CellValue> {
        match self {
            CellValue::Formula { cached, .. } => cached.as_deref(),
            _ => None,
        }
    }

    /// Get the effective value (cached value for formulas, value otherwise)
    pub fn effective_value(&self) -> &CellValue {
        match self {
            CellValue::Formula {
                cached: Some(v), ..
            } => v.effective_value(),
            _ => self,
        }
    }

    /// Get the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self.kind() {
            CellKind::Empty => "empty",
            CellKind::Number => "number",
            CellKind::Text => "text",
            CellKind::Boolean => "boolean",
            CellKind::Error => "error",
            CellKind::Formula => "formula",
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Error(e) => write!(f, "{}", e),
            CellValue::Formula {
                cached: Some(v), ..
            } => write!(f, "{}", v),
            CellValue::Formula { text, .. } => write!(f, "{}", text),
        }
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::text(s)
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<CellError> for CellValue {
    fn from(e: CellError) -> Self {
        CellValue::Error(e)
    }
}

/// Excel error values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellError {
    /// #NULL! - Incorrect range operator
    Null,
    /// #DIV/0! - Division by zero
    Div0,
    /// #VALUE! - Wrong type of argument or operand
    Value,
    /// #REF! - Invalid cell reference
    Ref,
    /// #NAME? - Unrecognized formula name
    Name,
    /// #NUM! - Invalid numeric value
    Num,
    /// #N/A - Value not available
    Na,
    /// #CIRCULAR! - Formula depends on itself
    Circular,
}

impl CellError {
    /// Every error value, in vocabulary order
    pub const ALL: [CellError; 8] = [
        CellError::Null,
        CellError::Div0,
        CellError::Value,
        CellError::Ref,
        CellError::Name,
        CellError::Num,
        CellError::Na,
        CellError::Circular,
    ];

    /// Get the display string for this error
    pub fn as_str(&self) -> &'static str {
        match self {
            CellError::Null => "#NULL!",
            CellError::Div0 => "#DIV/0!",
            CellError::Value => "#VALUE!",
            CellError::Ref => "#REF!",
            CellError::Name => "#NAME?",
            CellError::Num => "#NUM!",
            CellError::Na => "#N/A",
            CellError::Circular => "#CIRCULAR!",
        }
    }

    /// Parse an error string (exact match, case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        let upper = s.trim().to_ascii_uppercase();
        Self::ALL.into_iter().find(|e| e.as_str() == upper)
    }
}

impl fmt::Display for CellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formula_text_gets_equals_prefix() {
        assert_eq!(CellValue::formula("B1*2").formula_text(), Some("=B1*2"));
        assert_eq!(CellValue::formula("=B1*2").formula_text(), Some("=B1*2"));
    }

    #[test]
    fn test_kind_tag() {
        assert_eq!(CellValue::from(1.5).kind(), CellKind::Number);
        assert_eq!(CellValue::from("x").kind(), CellKind::Text);
        assert_eq!(CellValue::from(true).kind(), CellKind::Boolean);
        assert_eq!(CellValue::Error(CellError::Na).kind(), CellKind::Error);
        assert_eq!(CellValue::formula("1+1").kind(), CellKind::Formula);
        assert_eq!(CellValue::Empty.kind(), CellKind::Empty);
    }

    #[test]
    fn test_error_vocabulary() {
        for e in CellError::ALL {
            assert_eq!(CellError::from_str(e.as_str()), Some(e));
        }
        assert_eq!(CellError::from_str("#n/a"), Some(CellError::Na));
        assert_eq!(CellError::from_str("#BOGUS!"), None);
    }

    #[test]
    fn test_effective_value() {
        let v = CellValue::formula_with_cached("=1+1", CellValue::Number(2.0));
        assert_eq!(v.effective_value(), &CellValue::Number(2.0));
        assert_eq!(v.as_number(), Some(2.0));
        assert_eq!(v.to_string(), "2");
    }
}
