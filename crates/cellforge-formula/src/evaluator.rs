//! Formula evaluator
//!
//! Evaluates formula text directly from its token stream with a two-stack
//! (values + operators) shunting-yard pass. Cell references are resolved
//! through a [`CellGrid`]; formula cells are evaluated on demand, with
//! in-progress tracking so reference cycles surface as
//! [`ExcelError::Circular`] instead of unbounded recursion.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

use ahash::AHashSet;
use cellforge_core::{CellError, CellRange, CellReference, CellValue, Worksheet};

use crate::error::{ExcelError, FormulaResult};
use crate::functions::{math, FunctionRegistry};
use crate::lexer::{tokenize, Token, TokenKind};

/// Global function registry (lazily initialized)
static FUNCTION_REGISTRY: OnceLock<FunctionRegistry> = OnceLock::new();

fn get_function_registry() -> &'static FunctionRegistry {
    FUNCTION_REGISTRY.get_or_init(FunctionRegistry::new)
}

/// Value types during formula evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaValue {
    Number(f64),
    Text(String),
    Boolean(bool),
    Error(CellError),
    /// Range contents, flattened row-major
    Array(Vec<FormulaValue>),
    Empty,
}

impl FormulaValue {
    /// Coerce to a number for arithmetic
    ///
    /// Logicals are 1/0, empty is 0 and text must parse as a finite number.
    pub fn to_number(&self) -> FormulaResult<f64> {
        match self {
            FormulaValue::Number(n) => Ok(*n),
            FormulaValue::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
            FormulaValue::Empty => Ok(0.0),
            FormulaValue::Text(s) => parse_numeric_text(s).ok_or(ExcelError::Value),
            FormulaValue::Error(e) => Err((*e).into()),
            FormulaValue::Array(_) => Err(ExcelError::Value),
        }
    }

    /// Coerce to display text (`&`, text functions)
    pub fn to_text(&self) -> FormulaResult<String> {
        match self {
            FormulaValue::Number(n) => Ok(format_number(*n)),
            FormulaValue::Text(s) => Ok(s.clone()),
            FormulaValue::Boolean(b) => Ok(if *b { "TRUE" } else { "FALSE" }.to_string()),
            FormulaValue::Empty => Ok(String::new()),
            FormulaValue::Error(e) => Err((*e).into()),
            FormulaValue::Array(_) => Err(ExcelError::Value),
        }
    }

    /// Coerce to a logical
    pub fn to_bool(&self) -> FormulaResult<bool> {
        match self {
            FormulaValue::Boolean(b) => Ok(*b),
            FormulaValue::Number(n) => Ok(*n != 0.0),
            FormulaValue::Empty => Ok(false),
            FormulaValue::Text(s) => match s.trim().to_ascii_uppercase().as_str() {
                "TRUE" => Ok(true),
                "FALSE" => Ok(false),
                _ => Err(ExcelError::Value),
            },
            FormulaValue::Error(e) => Err((*e).into()),
            FormulaValue::Array(_) => Err(ExcelError::Value),
        }
    }

    /// Check if this is an error
    pub fn is_error(&self) -> bool {
        matches!(self, FormulaValue::Error(_))
    }

    /// Get the error if this is one
    pub fn get_error(&self) -> Option<CellError> {
        match self {
            FormulaValue::Error(e) => Some(*e),
            _ => None,
        }
    }
}

impl fmt::Display for FormulaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormulaValue::Number(n) => f.write_str(&format_number(*n)),
            FormulaValue::Text(s) => f.write_str(s),
            FormulaValue::Boolean(b) => f.write_str(if *b { "TRUE" } else { "FALSE" }),
            FormulaValue::Error(e) => write!(f, "{}", e),
            FormulaValue::Array(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "{{{}}}", parts.join(","))
            }
            FormulaValue::Empty => Ok(()),
        }
    }
}

impl From<&CellValue> for FormulaValue {
    /// Literal conversion; formula cells contribute their cached result
    fn from(value: &CellValue) -> Self {
        match value {
            CellValue::Empty => FormulaValue::Empty,
            CellValue::Number(n) => FormulaValue::Number(*n),
            CellValue::Text(s) => FormulaValue::Text(s.clone()),
            CellValue::Boolean(b) => FormulaValue::Boolean(*b),
            CellValue::Error(e) => FormulaValue::Error(*e),
            CellValue::Formula { cached, .. } => cached
                .as_deref()
                .map(FormulaValue::from)
                .unwrap_or(FormulaValue::Empty),
        }
    }
}

impl From<FormulaValue> for CellValue {
    fn from(value: FormulaValue) -> Self {
        match value {
            FormulaValue::Empty => CellValue::Empty,
            FormulaValue::Number(n) => CellValue::Number(n),
            FormulaValue::Text(s) => CellValue::Text(s),
            FormulaValue::Boolean(b) => CellValue::Boolean(b),
            FormulaValue::Error(e) => CellValue::Error(e),
            FormulaValue::Array(_) => CellValue::Error(CellError::Value),
        }
    }
}

/// Parse text as a number the way arithmetic coercion does
pub(crate) fn parse_numeric_text(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Format a number for display
///
/// Whole numbers print without a fractional part; everything else keeps at
/// most 15 significant digits with trailing zeros removed.
pub fn format_number(n: f64) -> String {
    if !n.is_finite() {
        return CellError::Num.as_str().to_string();
    }
    if n.fract() == 0.0 && n.abs() < 1e15 {
        return format!("{}", n as i64);
    }

    let magnitude = n.abs().log10().floor() as i32;
    let decimals = 14 - magnitude;
    if (0..=20).contains(&decimals) {
        let s = format!("{:.*}", decimals as usize, n);
        let s = s.trim_end_matches('0').trim_end_matches('.');
        s.to_string()
    } else {
        format!("{}", n)
    }
}

/// Read access to the cells a formula can reference
pub trait CellGrid {
    /// Value stored at `cell` ([`CellValue::Empty`] when unset)
    fn cell_value(&self, cell: CellReference) -> &CellValue;

    /// Smallest range covering every stored cell, `None` for an empty grid
    ///
    /// Range references are clipped to this before they are materialised.
    fn used_range(&self) -> Option<CellRange>;
}

impl CellGrid for Worksheet {
    fn cell_value(&self, cell: CellReference) -> &CellValue {
        self.get_value_at(cell.row, cell.col)
    }

    fn used_range(&self) -> Option<CellRange> {
        Worksheet::used_range(self)
    }
}

/// A grid with no cells, for formulas that reference nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyGrid;

static EMPTY_VALUE: CellValue = CellValue::Empty;

impl CellGrid for EmptyGrid {
    fn cell_value(&self, _cell: CellReference) -> &CellValue {
        &EMPTY_VALUE
    }

    fn used_range(&self) -> Option<CellRange> {
        None
    }
}

/// Evaluate a formula that references no cells
///
/// # Example
/// ```
/// use cellforge_formula::{evaluate, FormulaValue};
///
/// assert_eq!(evaluate("=2+3*4"), Ok(FormulaValue::Number(14.0)));
/// ```
pub fn evaluate(formula: &str) -> FormulaResult<FormulaValue> {
    Evaluator::new(&EmptyGrid).evaluate(formula, None)
}

/// Formula evaluator bound to a grid of cells
pub struct Evaluator<'g, G: CellGrid + ?Sized> {
    grid: &'g G,
}

impl<'g, G: CellGrid + ?Sized> Evaluator<'g, G> {
    pub fn new(grid: &'g G) -> Self {
        Self { grid }
    }

    /// Evaluate `formula` as if it lived in `origin`
    ///
    /// Error values surface as `Err`, as does an array left over at the top
    /// level. An unknown function name is not an error: it yields the text
    /// value `"#NAME?"`.
    pub fn evaluate(
        &self,
        formula: &str,
        origin: Option<CellReference>,
    ) -> FormulaResult<FormulaValue> {
        let ctx = EvaluationContext::new(self.grid);
        match ctx.evaluate_formula(formula, origin)? {
            FormulaValue::Error(e) => Err(e.into()),
            FormulaValue::Array(_) => Err(ExcelError::Value),
            value => Ok(value),
        }
    }

    /// Evaluate the formula stored at `cell`
    ///
    /// Non-formula cells return their literal value.
    pub fn evaluate_cell(&self, cell: CellReference) -> FormulaResult<FormulaValue> {
        match self.grid.cell_value(cell) {
            CellValue::Formula { text, .. } => self.evaluate(text, Some(cell)),
            CellValue::Error(e) => Err((*e).into()),
            other => Ok(other.into()),
        }
    }

    /// Result of the formula at `cell` in the form stored as its cached value
    ///
    /// Errors become [`CellValue::Error`]; so does the `"#NAME?"` text an
    /// unknown function yields.
    pub fn cached_result(&self, cell: CellReference) -> CellValue {
        match self.evaluate_cell(cell) {
            Ok(FormulaValue::Text(s)) if s == CellError::Name.as_str() => {
                CellValue::Error(CellError::Name)
            }
            Ok(value) => value.into(),
            Err(e) => CellValue::Error(e.to_cell_error()),
        }
    }
}

/// State of one top-level evaluation
pub struct EvaluationContext<'g, G: CellGrid + ?Sized> {
    grid: &'g G,
    /// Formula cells currently being evaluated, by (row, col)
    in_progress: RefCell<AHashSet<(u32, u32)>>,
}

/// Removes a cell from the in-progress set when dropped
struct InProgressGuard<'c> {
    set: &'c RefCell<AHashSet<(u32, u32)>>,
    key: (u32, u32),
}

impl Drop for InProgressGuard<'_> {
    fn drop(&mut self) {
        self.set.borrow_mut().remove(&self.key);
    }
}

impl<'g, G: CellGrid + ?Sized> EvaluationContext<'g, G> {
    pub fn new(grid: &'g G) -> Self {
        Self {
            grid,
            in_progress: RefCell::new(AHashSet::new()),
        }
    }

    /// Evaluate formula text, marking `origin` in progress for the duration
    pub fn evaluate_formula(
        &self,
        formula: &str,
        origin: Option<CellReference>,
    ) -> FormulaResult<FormulaValue> {
        let _guard = match origin {
            Some(cell) => Some(self.enter(cell)?),
            None => None,
        };
        let tokens = tokenize(formula);
        self.evaluate_tokens(&tokens)
    }

    fn enter(&self, cell: CellReference) -> FormulaResult<InProgressGuard<'_>> {
        let key = (cell.row, cell.col);
        if !self.in_progress.borrow_mut().insert(key) {
            return Err(ExcelError::Circular);
        }
        Ok(InProgressGuard {
            set: &self.in_progress,
            key,
        })
    }

    fn evaluate_tokens(&self, tokens: &[Token]) -> FormulaResult<FormulaValue> {
        let mut values: Vec<FormulaValue> = Vec::new();
        let mut ops: Vec<StackEntry> = Vec::new();
        let mut i = 0;

        while i < tokens.len() {
            let token = &tokens[i];
            match token.kind {
                TokenKind::Number => {
                    let n = token
                        .text
                        .parse::<f64>()
                        .map_err(|_| ExcelError::Value)?;
                    values.push(FormulaValue::Number(n));
                }
                TokenKind::Text => match token.string_value() {
                    Some(s) => values.push(FormulaValue::Text(s)),
                    None => return Err(ExcelError::Value),
                },
                TokenKind::Logical => values.push(FormulaValue::Boolean(token.text == "TRUE")),
                TokenKind::ErrorLiteral => {
                    let e = token.error_value().ok_or(ExcelError::Value)?;
                    values.push(FormulaValue::Error(e));
                }
                TokenKind::CellRef => {
                    let cell = CellReference::parse(&token.text)
                        .map_err(|_| ExcelError::Literal(CellError::Ref))?;
                    values.push(self.read_cell(cell)?);
                }
                TokenKind::RangeRef => {
                    let range = CellRange::parse(&token.text)
                        .map_err(|_| ExcelError::Literal(CellError::Ref))?;
                    values.push(self.read_range(range)?);
                }
                TokenKind::FunctionName => {
                    let (args, next) = split_call(tokens, i)?;
                    values.push(self.call_function(&token.text, &args)?);
                    i = next;
                    continue;
                }
                TokenKind::Operator => {
                    if token.text == "%" {
                        let v = values.pop().unwrap_or(FormulaValue::Number(0.0));
                        values.push(FormulaValue::Number(v.to_number()? / 100.0));
                    } else if is_prefix_position(tokens, i) && (token.text == "-" || token.text == "+") {
                        let op = if token.text == "-" {
                            UnaryOp::Negate
                        } else {
                            UnaryOp::Plus
                        };
                        ops.push(StackEntry::Unary(op));
                    } else {
                        let op = BinaryOp::from_symbol(&token.text).ok_or(ExcelError::Value)?;
                        while let Some(top) = ops.last().copied() {
                            match top.precedence() {
                                Some(p) if p >= op.precedence() => {
                                    ops.pop();
                                    apply(top, &mut values)?;
                                }
                                _ => break,
                            }
                        }
                        ops.push(StackEntry::Binary(op));
                    }
                }
                TokenKind::GroupOpen => ops.push(StackEntry::Group),
                TokenKind::GroupClose => loop {
                    match ops.pop() {
                        Some(StackEntry::Group) => break,
                        Some(entry) => apply(entry, &mut values)?,
                        None => return Err(ExcelError::Value),
                    }
                },
                // Separators only make sense inside a function call
                TokenKind::ArgSeparator => return Err(ExcelError::Value),
            }
            i += 1;
        }

        while let Some(entry) = ops.pop() {
            match entry {
                StackEntry::Group => return Err(ExcelError::Value),
                entry => apply(entry, &mut values)?,
            }
        }

        match values.len() {
            0 => Ok(FormulaValue::Empty),
            1 => Ok(values.pop().unwrap_or(FormulaValue::Empty)),
            _ => Err(ExcelError::Value),
        }
    }

    /// Value of a single referenced cell (unset cells read as 0)
    fn read_cell(&self, cell: CellReference) -> FormulaResult<FormulaValue> {
        match self.grid.cell_value(cell) {
            CellValue::Empty => Ok(FormulaValue::Number(0.0)),
            other => self.resolve(cell, other),
        }
    }

    /// Row-major contents of a range (unset cells are empty)
    fn read_range(&self, range: CellRange) -> FormulaResult<FormulaValue> {
        let used = match self.grid.used_range() {
            Some(used) => used,
            None => return Ok(FormulaValue::Array(Vec::new())),
        };

        let end_row = range.end.row.min(used.end.row);
        let end_col = range.end.col.min(used.end.col);
        if range.start.row > end_row || range.start.col > end_col {
            return Ok(FormulaValue::Array(Vec::new()));
        }

        let clipped = CellRange::from_indices(range.start.row, range.start.col, end_row, end_col);
        clipped
            .cells()
            .map(|cell| self.resolve(cell, self.grid.cell_value(cell)))
            .collect::<FormulaResult<Vec<_>>>()
            .map(FormulaValue::Array)
    }

    fn resolve(&self, cell: CellReference, value: &CellValue) -> FormulaResult<FormulaValue> {
        match value {
            CellValue::Formula { text, .. } => match self.evaluate_formula(text, Some(cell))? {
                FormulaValue::Array(_) => Err(ExcelError::Value),
                v => Ok(v),
            },
            other => Ok(other.into()),
        }
    }

    fn call_function(&self, name: &str, arg_tokens: &[&[Token]]) -> FormulaResult<FormulaValue> {
        let func = match get_function_registry().get(name) {
            Some(func) => func,
            None => return Ok(FormulaValue::Text(CellError::Name.as_str().to_string())),
        };

        if arg_tokens.len() < func.min_args || func.max_args.map_or(false, |max| arg_tokens.len() > max) {
            return Err(ExcelError::Value);
        }

        let mut args = Vec::with_capacity(arg_tokens.len());
        for tokens in arg_tokens {
            // Errors become values so functions like IF can ignore an unused branch
            match self.evaluate_tokens(tokens) {
                Ok(v) => args.push(v),
                Err(ExcelError::Circular) => return Err(ExcelError::Circular),
                Err(e) => args.push(FormulaValue::Error(e.to_cell_error())),
            }
        }

        (func.implementation)(&args)
    }
}

/// Split the call starting at the function name `tokens[start]` into its
/// top-level argument slices. Returns the arguments and the index just past
/// the closing parenthesis.
fn split_call(tokens: &[Token], start: usize) -> FormulaResult<(Vec<&[Token]>, usize)> {
    let open = start + 1;
    match tokens.get(open) {
        Some(t) if t.kind == TokenKind::GroupOpen => {}
        _ => return Err(ExcelError::Value),
    }

    let mut args = Vec::new();
    let mut depth = 1usize;
    let mut arg_start = open + 1;

    for (j, token) in tokens.iter().enumerate().skip(open + 1) {
        match token.kind {
            TokenKind::GroupOpen => depth += 1,
            TokenKind::GroupClose => {
                depth -= 1;
                if depth == 0 {
                    // `F()` has no arguments; `F(1,)` has an empty second one
                    if j > open + 1 || !args.is_empty() {
                        args.push(&tokens[arg_start..j]);
                    }
                    return Ok((args, j + 1));
                }
            }
            TokenKind::ArgSeparator if depth == 1 => {
                args.push(&tokens[arg_start..j]);
                arg_start = j + 1;
            }
            _ => {}
        }
    }

    Err(ExcelError::Value)
}

/// Whether `tokens[i]` sits where an operand is expected
fn is_prefix_position(tokens: &[Token], i: usize) -> bool {
    match i.checked_sub(1).and_then(|p| tokens.get(p)) {
        None => true,
        Some(prev) => match prev.kind {
            TokenKind::Operator => prev.text != "%",
            TokenKind::GroupOpen | TokenKind::ArgSeparator => true,
            _ => false,
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    Concat,
    Equal,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
}

impl BinaryOp {
    fn from_symbol(s: &str) -> Option<Self> {
        Some(match s {
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Subtract,
            "*" => BinaryOp::Multiply,
            "/" => BinaryOp::Divide,
            "^" => BinaryOp::Power,
            "&" => BinaryOp::Concat,
            "=" => BinaryOp::Equal,
            "<>" => BinaryOp::NotEqual,
            "<" => BinaryOp::Less,
            ">" => BinaryOp::Greater,
            "<=" => BinaryOp::LessEqual,
            ">=" => BinaryOp::GreaterEqual,
            _ => return None,
        })
    }

    fn precedence(self) -> u8 {
        match self {
            BinaryOp::Power => 4,
            BinaryOp::Multiply | BinaryOp::Divide => 3,
            BinaryOp::Add | BinaryOp::Subtract | BinaryOp::Concat => 2,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnaryOp {
    Negate,
    Plus,
}

const UNARY_PRECEDENCE: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StackEntry {
    Binary(BinaryOp),
    Unary(UnaryOp),
    Group,
}

impl StackEntry {
    fn precedence(self) -> Option<u8> {
        match self {
            StackEntry::Binary(op) => Some(op.precedence()),
            StackEntry::Unary(_) => Some(UNARY_PRECEDENCE),
            StackEntry::Group => None,
        }
    }
}

/// Pop operands for `entry`, apply it and push the result
///
/// A missing operand counts as 0.
fn apply(entry: StackEntry, values: &mut Vec<FormulaValue>) -> FormulaResult<()> {
    let result = match entry {
        StackEntry::Unary(op) => {
            let v = values.pop().unwrap_or(FormulaValue::Number(0.0));
            match op {
                UnaryOp::Negate => FormulaValue::Number(-v.to_number()?),
                UnaryOp::Plus => v,
            }
        }
        StackEntry::Binary(op) => {
            let right = values.pop().unwrap_or(FormulaValue::Number(0.0));
            let left = values.pop().unwrap_or(FormulaValue::Number(0.0));
            evaluate_binary_op(op, &left, &right)?
        }
        StackEntry::Group => return Err(ExcelError::Value),
    };
    values.push(result);
    Ok(())
}

fn evaluate_binary_op(
    op: BinaryOp,
    left: &FormulaValue,
    right: &FormulaValue,
) -> FormulaResult<FormulaValue> {
    // Propagate errors
    if let Some(e) = left.get_error().or_else(|| right.get_error()) {
        return Err(e.into());
    }

    match op {
        BinaryOp::Add => arithmetic(left, right, |l, r| Ok(l + r)),
        BinaryOp::Subtract => arithmetic(left, right, |l, r| Ok(l - r)),
        BinaryOp::Multiply => arithmetic(left, right, |l, r| Ok(l * r)),
        BinaryOp::Divide => arithmetic(left, right, |l, r| {
            if r == 0.0 {
                Err(ExcelError::DivisionByZero)
            } else {
                Ok(l / r)
            }
        }),
        BinaryOp::Power => arithmetic(left, right, math::power),
        BinaryOp::Concat => Ok(FormulaValue::Text(left.to_text()? + &right.to_text()?)),
        _ => {
            let ordering = compare_values(left, right)?;
            let result = match op {
                BinaryOp::Equal => ordering == Ordering::Equal,
                BinaryOp::NotEqual => ordering != Ordering::Equal,
                BinaryOp::Less => ordering == Ordering::Less,
                BinaryOp::Greater => ordering == Ordering::Greater,
                BinaryOp::LessEqual => ordering != Ordering::Greater,
                BinaryOp::GreaterEqual => ordering != Ordering::Less,
                _ => return Err(ExcelError::Value),
            };
            Ok(FormulaValue::Boolean(result))
        }
    }
}

fn arithmetic<F>(left: &FormulaValue, right: &FormulaValue, f: F) -> FormulaResult<FormulaValue>
where
    F: FnOnce(f64, f64) -> FormulaResult<f64>,
{
    let n = f(left.to_number()?, right.to_number()?)?;
    if n.is_finite() {
        Ok(FormulaValue::Number(n))
    } else {
        Err(ExcelError::Num)
    }
}

/// Excel ordering: numbers, then text (case-insensitive), then logicals
///
/// An empty operand takes the zero value of the other side's type.
fn compare_values(left: &FormulaValue, right: &FormulaValue) -> FormulaResult<Ordering> {
    fn rank(v: &FormulaValue) -> u8 {
        match v {
            FormulaValue::Number(_) => 0,
            FormulaValue::Text(_) => 1,
            _ => 2,
        }
    }

    let (left, right) = match (left, right) {
        (FormulaValue::Empty, FormulaValue::Empty) => return Ok(Ordering::Equal),
        (FormulaValue::Empty, other) => (empty_like(other), other.clone()),
        (other, FormulaValue::Empty) => (other.clone(), empty_like(other)),
        (l, r) => (l.clone(), r.clone()),
    };

    match (&left, &right) {
        (FormulaValue::Array(_), _) | (_, FormulaValue::Array(_)) => Err(ExcelError::Value),
        (FormulaValue::Number(l), FormulaValue::Number(r)) => {
            Ok(l.partial_cmp(r).unwrap_or(Ordering::Equal))
        }
        (FormulaValue::Text(l), FormulaValue::Text(r)) => {
            Ok(l.to_lowercase().cmp(&r.to_lowercase()))
        }
        (FormulaValue::Boolean(l), FormulaValue::Boolean(r)) => Ok(l.cmp(r)),
        (l, r) => Ok(rank(l).cmp(&rank(r))),
    }
}

fn empty_like(other: &FormulaValue) -> FormulaValue {
    match other {
        FormulaValue::Text(_) => FormulaValue::Text(String::new()),
        FormulaValue::Boolean(_) => FormulaValue::Boolean(false),
        _ => FormulaValue::Number(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn eval(formula: &str) -> FormulaResult<FormulaValue> {
        evaluate(formula)
    }

    fn num(formula: &str) -> f64 {
        match eval(formula) {
            Ok(FormulaValue::Number(n)) => n,
            other => panic!("{} evaluated to {:?}", formula, other),
        }
    }

    fn eval_in(ws: &Worksheet, address: &str) -> FormulaResult<FormulaValue> {
        let cell = CellReference::parse(address).unwrap();
        Evaluator::new(ws).evaluate_cell(cell)
    }

    #[test]
    fn test_evaluate_literals() {
        assert_eq!(eval("=42"), Ok(FormulaValue::Number(42.0)));
        assert_eq!(eval("=\"hello\""), Ok(FormulaValue::Text("hello".into())));
        assert_eq!(eval("=TRUE"), Ok(FormulaValue::Boolean(true)));
        assert_eq!(eval(""), Ok(FormulaValue::Empty));
    }

    #[test]
    fn test_evaluate_precedence() {
        assert_eq!(num("=2+3*4"), 14.0);
        assert_eq!(num("=(2+3)*4"), 20.0);
        assert_eq!(num("=10-4-3"), 3.0);
        assert_eq!(num("=2^3^2"), 64.0);
        assert_eq!(num("=-2^2"), 4.0);
        assert_eq!(num("=2*-3"), -6.0);
        assert_eq!(num("=-(1+2)"), -3.0);
        assert_eq!(num("=50%"), 0.5);
        assert_eq!(num("=50%-2"), -1.5);
        assert_eq!(num("=50%--2"), 2.5);
        assert_eq!(num("=3-4"), -1.0);
    }

    #[test]
    fn test_comparisons_bind_loosest() {
        assert_eq!(eval("=2=1+1"), Ok(FormulaValue::Boolean(true)));
        assert_eq!(eval("=1+1<>2"), Ok(FormulaValue::Boolean(false)));
        assert_eq!(eval("=\"a\"&\"b\"=\"AB\""), Ok(FormulaValue::Boolean(true)));
    }

    #[test]
    fn test_comparison_ordering() {
        assert_eq!(eval("=\"abc\"<\"ABD\""), Ok(FormulaValue::Boolean(true)));
        assert_eq!(eval("=1<\"a\""), Ok(FormulaValue::Boolean(true)));
        assert_eq!(eval("=\"z\"<TRUE"), Ok(FormulaValue::Boolean(true)));
        assert_eq!(eval("=FALSE<TRUE"), Ok(FormulaValue::Boolean(true)));
        assert_eq!(eval("=3>=3"), Ok(FormulaValue::Boolean(true)));
    }

    #[test]
    fn test_concatenation() {
        assert_eq!(eval("=\"n=\"&1.5"), Ok(FormulaValue::Text("n=1.5".into())));
        assert_eq!(eval("=1&2"), Ok(FormulaValue::Text("12".into())));
        assert_eq!(eval("=\"x\"&TRUE"), Ok(FormulaValue::Text("xTRUE".into())));
    }

    #[test]
    fn test_errors() {
        assert_eq!(eval("=5/0"), Err(ExcelError::DivisionByZero));
        assert_eq!(eval("=1+\"abc\""), Err(ExcelError::Value));
        assert_eq!(eval("=\"3\"+1"), Ok(FormulaValue::Number(4.0)));
        assert_eq!(eval("=hello"), Err(ExcelError::Value));
        assert_eq!(eval("=(1+2"), Err(ExcelError::Value));
        assert_eq!(eval("=1+2)"), Err(ExcelError::Value));
        assert_eq!(eval("=1 2"), Err(ExcelError::Value));
        assert_eq!(eval("=#N/A"), Err(ExcelError::Literal(CellError::Na)));
        assert_eq!(eval("=#DIV/0!+1"), Err(ExcelError::DivisionByZero));
        assert_eq!(eval("=0^-1"), Err(ExcelError::DivisionByZero));
        assert_eq!(eval("=10^400"), Err(ExcelError::Num));
    }

    #[test]
    fn test_missing_operand_is_zero() {
        assert_eq!(num("=*5"), 0.0);
        assert_eq!(num("=5+"), 5.0);
    }

    #[test]
    fn test_functions() {
        assert_eq!(num("=SUM(1,2,3)"), 6.0);
        assert_eq!(eval("=AVERAGE()"), Err(ExcelError::DivisionByZero));
        assert_eq!(eval("=IF(1>0,\"yes\",\"no\")"), Ok(FormulaValue::Text("yes".into())));
        assert_eq!(num("=SUM(1,MAX(2,7),ROUND(2.5))"), 11.0);
        assert_eq!(num("=sum(1;2)"), 3.0);
    }

    #[test]
    fn test_unknown_function_is_a_value() {
        assert_eq!(eval("=NOSUCH(1)"), Ok(FormulaValue::Text("#NAME?".into())));
    }

    #[test]
    fn test_arity_mismatch() {
        assert_eq!(eval("=ABS()"), Err(ExcelError::Value));
        assert_eq!(eval("=ABS(1,2)"), Err(ExcelError::Value));
        assert_eq!(eval("=PI(1)"), Err(ExcelError::Value));
    }

    #[test]
    fn test_if_ignores_unused_error_branch() {
        assert_eq!(num("=IF(TRUE,1,1/0)"), 1.0);
        assert_eq!(eval("=IF(FALSE,1,1/0)"), Err(ExcelError::DivisionByZero));
    }

    #[test]
    fn test_cell_references() {
        let mut ws = Worksheet::new("Sheet1");
        ws.set_cell_value("A1", 10.0).unwrap();
        ws.set_cell_value("A2", 20.0).unwrap();
        ws.set_cell_value("A3", "text").unwrap();
        ws.set_cell_formula("B1", "=A1*2").unwrap();
        ws.set_cell_formula("B2", "=B1+A2").unwrap();
        ws.set_cell_formula("B3", "=SUM(A1:A5)").unwrap();
        ws.set_cell_formula("B4", "=Z99+1").unwrap();
        ws.set_cell_formula("B5", "=COUNTA(A1:A3)").unwrap();

        assert_eq!(eval_in(&ws, "B1"), Ok(FormulaValue::Number(20.0)));
        assert_eq!(eval_in(&ws, "B2"), Ok(FormulaValue::Number(40.0)));
        assert_eq!(eval_in(&ws, "B3"), Ok(FormulaValue::Number(30.0)));
        assert_eq!(eval_in(&ws, "B4"), Ok(FormulaValue::Number(1.0)));
        assert_eq!(eval_in(&ws, "B5"), Ok(FormulaValue::Number(3.0)));
        assert_eq!(eval_in(&ws, "A3"), Ok(FormulaValue::Text("text".into())));
    }

    #[test]
    fn test_range_outside_used_area() {
        let mut ws = Worksheet::new("Sheet1");
        ws.set_cell_value("A1", 1.0).unwrap();
        let evaluator = Evaluator::new(&ws);
        assert_eq!(
            evaluator.evaluate("=SUM(A1:XFD1048576)", None),
            Ok(FormulaValue::Number(1.0))
        );
        assert_eq!(
            evaluator.evaluate("=COUNT(D5:E9)", None),
            Ok(FormulaValue::Number(0.0))
        );
    }

    #[test]
    fn test_circular_reference() {
        let mut ws = Worksheet::new("Sheet1");
        ws.set_cell_formula("A1", "=B1").unwrap();
        ws.set_cell_formula("B1", "=A1").unwrap();
        ws.set_cell_formula("C1", "=C1+1").unwrap();
        ws.set_cell_formula("D1", "=IF(TRUE,1,SUM(A1))").unwrap();

        assert_eq!(eval_in(&ws, "A1"), Err(ExcelError::Circular));
        assert_eq!(eval_in(&ws, "B1"), Err(ExcelError::Circular));
        assert_eq!(eval_in(&ws, "C1"), Err(ExcelError::Circular));
        // Circular is never swallowed into an argument value
        assert_eq!(eval_in(&ws, "D1"), Err(ExcelError::Circular));
    }

    #[test]
    fn test_shared_reference_is_not_circular() {
        let mut ws = Worksheet::new("Sheet1");
        ws.set_cell_value("A1", 2.0).unwrap();
        ws.set_cell_formula("B1", "=A1*3").unwrap();
        ws.set_cell_formula("C1", "=B1+B1").unwrap();
        assert_eq!(eval_in(&ws, "C1"), Ok(FormulaValue::Number(12.0)));
    }

    #[test]
    fn test_error_cells_propagate() {
        let mut ws = Worksheet::new("Sheet1");
        ws.set_cell_value("A1", CellError::Ref).unwrap();
        ws.set_cell_formula("B1", "=A1+1").unwrap();
        ws.set_cell_formula("B2", "=SUM(A1:A2)").unwrap();
        assert_eq!(eval_in(&ws, "B1"), Err(ExcelError::Literal(CellError::Ref)));
        assert_eq!(eval_in(&ws, "B2"), Err(ExcelError::Literal(CellError::Ref)));
    }

    #[test]
    fn test_cached_result() {
        let mut ws = Worksheet::new("Sheet1");
        ws.set_cell_formula("A1", "=1+1").unwrap();
        ws.set_cell_formula("A2", "=1/0").unwrap();
        ws.set_cell_formula("A3", "=NOSUCHFN(1)").unwrap();
        ws.set_cell_formula("A4", "=A4").unwrap();
        let evaluator = Evaluator::new(&ws);
        let at = |a: &str| evaluator.cached_result(CellReference::parse(a).unwrap());

        assert_eq!(at("A1"), CellValue::Number(2.0));
        assert_eq!(at("A2"), CellValue::Error(CellError::Div0));
        assert_eq!(at("A3"), CellValue::Error(CellError::Name));
        assert_eq!(at("A4"), CellValue::Error(CellError::Circular));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-12.5), "-12.5");
        assert_eq!(format_number(0.1 + 0.2), "0.3");
        assert_eq!(format_number(1.0 / 3.0), "0.333333333333333");
    }

    #[test]
    fn test_coercions() {
        assert_eq!(FormulaValue::Text(" 2.5 ".into()).to_number(), Ok(2.5));
        assert_eq!(FormulaValue::Text("inf".into()).to_number(), Err(ExcelError::Value));
        assert_eq!(FormulaValue::Text("true".into()).to_bool(), Ok(true));
        assert_eq!(FormulaValue::Empty.to_text(), Ok(String::new()));
        assert_eq!(
            CellValue::from(FormulaValue::Array(vec![])),
            CellValue::Error(CellError::Value)
        );
    }
}
