//! Tests for formula evaluation with cell references

use cellforge::prelude::*;
use cellforge::{evaluate, evaluate_at, tokenize, Evaluator, ExcelError, TokenKind};
use pretty_assertions::assert_eq;

fn number(n: f64) -> FormulaValue {
    FormulaValue::Number(n)
}

#[test]
fn test_arithmetic_precedence() {
    assert_eq!(evaluate("2+3*4"), Ok(number(14.0)));
    assert_eq!(evaluate("(2+3)*4"), Ok(number(20.0)));
    assert_eq!(evaluate("=2^3^2"), Ok(number(64.0)));
    assert_eq!(evaluate("=10-4-3"), Ok(number(3.0)));
    assert_eq!(evaluate("=-2^2"), Ok(number(4.0)));
    assert_eq!(evaluate("=50%*4"), Ok(number(2.0)));
    assert_eq!(evaluate("=50%-2"), Ok(number(-1.5)));
    assert_eq!(evaluate("=2=1+1"), Ok(FormulaValue::Boolean(true)));
    assert_eq!(evaluate("=1+2&\"x\""), Ok(FormulaValue::Text("3x".into())));
}

#[test]
fn test_division_by_zero() {
    assert_eq!(evaluate("5/0"), Err(ExcelError::DivisionByZero));
    assert_eq!(ExcelError::DivisionByZero.to_string(), "#DIV/0!");
}

#[test]
fn test_functions() {
    assert_eq!(evaluate("=SUM(1,2,3)"), Ok(number(6.0)));
    assert_eq!(evaluate("=AVERAGE()"), Err(ExcelError::DivisionByZero));
    assert_eq!(
        evaluate("=IF(1>0,\"yes\",\"no\")"),
        Ok(FormulaValue::Text("yes".into()))
    );
    assert_eq!(evaluate("=ROUND(2.5)"), Ok(number(3.0)));
    assert_eq!(evaluate("=ROUND(-3.14159,2)"), Ok(number(-3.14)));
    assert_eq!(evaluate("=SQRT(-4)"), Err(ExcelError::Num));
    assert_eq!(evaluate("=MID(\"spreadsheet\",7,5)"), Ok(FormulaValue::Text("sheet".into())));
    assert_eq!(evaluate("=TRIM(\"  a   b \")"), Ok(FormulaValue::Text("a b".into())));
    assert_eq!(evaluate("=YEAR(45000)"), Ok(number(2023.0)));
    assert_eq!(evaluate("=AND(TRUE,NOT(FALSE))"), Ok(FormulaValue::Boolean(true)));
    assert_eq!(evaluate("=ABS()"), Err(ExcelError::Value));
}

#[test]
fn test_unknown_function_is_a_value() {
    assert_eq!(
        evaluate("=NOTAFUNCTION(1,2)"),
        Ok(FormulaValue::Text("#NAME?".into()))
    );
}

#[test]
fn test_text_coercion() {
    assert_eq!(evaluate("=\"3\"+4"), Ok(number(7.0)));
    assert_eq!(evaluate("=\"three\"+4"), Err(ExcelError::Value));
    assert_eq!(evaluate("=TRUE+TRUE"), Ok(number(2.0)));
    assert_eq!(evaluate("=\"abc\"=\"ABC\""), Ok(FormulaValue::Boolean(true)));
    assert_eq!(evaluate("=1<\"a\""), Ok(FormulaValue::Boolean(true)));
}

#[test]
fn test_evaluate_with_cell_references() {
    let mut sheet = Worksheet::new("Sheet1");
    sheet.set_cell_value("A1", 10.0).unwrap();
    sheet.set_cell_value("A2", 20.0).unwrap();
    sheet.set_cell_value("A3", "skip me").unwrap();
    sheet.set_cell_value("B1", 5.0).unwrap();

    let ev = Evaluator::new(&sheet);
    assert_eq!(ev.evaluate("=A1+B1", None), Ok(number(15.0)));
    assert_eq!(ev.evaluate("=$A$1*2", None), Ok(number(20.0)));
    assert_eq!(ev.evaluate("=SUM(A1:A3)", None), Ok(number(30.0)));
    assert_eq!(ev.evaluate("=COUNT(A1:B3)", None), Ok(number(3.0)));
    assert_eq!(ev.evaluate("=COUNTA(A1:A3)", None), Ok(number(3.0)));
    assert_eq!(ev.evaluate("=MAX(A1:B2)", None), Ok(number(20.0)));
    // Unset cells read as 0
    assert_eq!(ev.evaluate("=Z99+1", None), Ok(number(1.0)));
}

#[test]
fn test_formula_chain() {
    let mut sheet = Worksheet::new("Sheet1");
    sheet.set_cell_value("A1", 5.0).unwrap();
    sheet.set_cell_formula("A2", "=A1*2").unwrap();
    sheet.set_cell_formula("A3", "=A2+A1").unwrap();
    sheet.set_cell_formula("A4", "=IF(A3>10,\"big\",\"small\")").unwrap();

    assert_eq!(
        evaluate_at(&sheet, "=A4&\"!\"", Some("B1")).unwrap(),
        FormulaValue::Text("big!".into())
    );
    let a3 = CellReference::parse("A3").unwrap();
    assert_eq!(Evaluator::new(&sheet).evaluate_cell(a3), Ok(number(15.0)));
}

#[test]
fn test_circular_reference() {
    let mut sheet = Worksheet::new("Sheet1");
    sheet.set_cell_formula("A1", "=B1").unwrap();
    sheet.set_cell_formula("B1", "=A1").unwrap();
    sheet.set_cell_formula("C1", "=C1+1").unwrap();
    sheet.set_cell_formula("D1", "=SUM(A1,1)").unwrap();

    let ev = Evaluator::new(&sheet);
    let cell = |a: &str| CellReference::parse(a).unwrap();
    assert_eq!(ev.evaluate_cell(cell("A1")), Err(ExcelError::Circular));
    assert_eq!(ev.evaluate_cell(cell("C1")), Err(ExcelError::Circular));
    // Circular errors propagate through function arguments
    assert_eq!(ev.evaluate_cell(cell("D1")), Err(ExcelError::Circular));
    assert_eq!(ExcelError::Circular.to_string(), "#CIRCULAR!");
}

#[test]
fn test_long_reference_chain() {
    let mut sheet = Worksheet::new("Sheet1");
    sheet.set_cell_value_at(1, 1, 1.0).unwrap();
    for row in 2..=200 {
        sheet
            .set_cell_formula_at(row, 1, &format!("=A{}+1", row - 1))
            .unwrap();
    }

    let last = CellReference::new(200, 1);
    assert_eq!(Evaluator::new(&sheet).evaluate_cell(last), Ok(number(200.0)));
}

#[test]
fn test_error_literals() {
    let mut sheet = Worksheet::new("Sheet1");
    sheet.set_cell_value("A1", CellError::Na).unwrap();

    let ev = Evaluator::new(&sheet);
    assert_eq!(
        ev.evaluate("=A1+1", None),
        Err(ExcelError::Literal(CellError::Na))
    );
    assert_eq!(ev.evaluate("=#REF!", None), Err(ExcelError::Literal(CellError::Ref)));
}

#[test]
fn test_malformed_formulas_do_not_panic() {
    for formula in ["=", "=(", "=)", "=1+", "=SUM(1,", "=\"unterminated", "=@@@", "=1 2"] {
        let _ = evaluate(formula);
    }
    assert_eq!(evaluate("=1+"), Ok(number(1.0)));
}

#[test]
fn test_tokenize() {
    let kinds: Vec<TokenKind> = tokenize("=SUM(A1:B2, -1.5E2) & \"x\"")
        .into_iter()
        .map(|t| t.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::FunctionName,
            TokenKind::GroupOpen,
            TokenKind::RangeRef,
            TokenKind::ArgSeparator,
            TokenKind::Number,
            TokenKind::GroupClose,
            TokenKind::Operator,
            TokenKind::Text,
        ]
    );

    let minus: Vec<String> = tokenize("3-4").into_iter().map(|t| t.text).collect();
    assert_eq!(minus, vec!["3", "-", "4"]);
}
