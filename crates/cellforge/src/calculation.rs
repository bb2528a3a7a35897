//! Workbook calculation
//!
//! Evaluates every formula cell in a workbook and stores the result as the
//! cell's cached value, so that the values written to disk match what a
//! spreadsheet application would display.
//!
//! # Example
//!
//! ```rust
//! use cellforge::prelude::*;
//!
//! let mut workbook = Workbook::new();
//! let sheet = workbook.worksheet_mut(0).unwrap();
//! sheet.set_cell_value("A1", 10.0).unwrap();
//! sheet.set_cell_value("A2", 20.0).unwrap();
//! sheet.set_cell_formula("A3", "=A1+A2").unwrap();
//!
//! let stats = workbook.calculate();
//! assert_eq!(stats.cells_calculated, 1);
//! ```

use crate::{CellError, CellReference, CellValue, Evaluator, Workbook, Worksheet};

/// Options for workbook calculation
#[derive(Debug, Clone)]
pub struct CalculationOptions {
    /// Store error results (`#DIV/0!`, `#CIRCULAR!`, ...) as cached values.
    /// When false, a formula that fails keeps whatever cached value it had.
    pub store_errors: bool,
}

impl Default for CalculationOptions {
    fn default() -> Self {
        Self { store_errors: true }
    }
}

impl CalculationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store_errors(mut self, store_errors: bool) -> Self {
        self.store_errors = store_errors;
        self
    }
}

/// Statistics from a calculation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalculationStats {
    /// Total number of formula cells
    pub formula_count: usize,
    /// Number of cells whose cached value was updated
    pub cells_calculated: usize,
    /// Number of formulas that evaluated to an error
    pub errors: usize,
    /// Number of formulas caught in a reference cycle
    pub circular_references: usize,
}

impl CalculationStats {
    fn merge(&mut self, other: CalculationStats) {
        self.formula_count += other.formula_count;
        self.cells_calculated += other.cells_calculated;
        self.errors += other.errors;
        self.circular_references += other.circular_references;
    }
}

/// Extension trait for Workbook to add calculation methods
pub trait WorkbookCalculationExt {
    /// Calculate all formulas in the workbook with default options
    fn calculate(&mut self) -> CalculationStats;

    /// Calculate all formulas with custom options
    fn calculate_with_options(&mut self, options: &CalculationOptions) -> CalculationStats;
}

impl WorkbookCalculationExt for Workbook {
    fn calculate(&mut self) -> CalculationStats {
        self.calculate_with_options(&CalculationOptions::default())
    }

    fn calculate_with_options(&mut self, options: &CalculationOptions) -> CalculationStats {
        let mut stats = CalculationStats::default();
        for sheet in self.worksheets_mut() {
            let sheet_stats = calculate_sheet(sheet, options);
            log::debug!(
                "calculated sheet '{}': {} formulas, {} errors",
                sheet.name(),
                sheet_stats.formula_count,
                sheet_stats.errors
            );
            stats.merge(sheet_stats);
        }
        stats
    }
}

/// Calculate every formula on one sheet
///
/// Results are computed against the sheet as it stands and only then stored,
/// so the order in which cells are visited does not matter.
pub fn calculate_sheet(sheet: &mut Worksheet, options: &CalculationOptions) -> CalculationStats {
    let formulas: Vec<CellReference> = sheet
        .iter_cells()
        .filter(|(_, data)| data.value.is_formula())
        .map(|(cell, _)| cell)
        .collect();

    let evaluator = Evaluator::new(&*sheet);
    let results: Vec<(CellReference, CellValue)> = formulas
        .iter()
        .map(|&cell| (cell, evaluator.cached_result(cell)))
        .collect();

    let mut stats = CalculationStats {
        formula_count: formulas.len(),
        ..Default::default()
    };

    for (cell, value) in results {
        if let CellValue::Error(e) = value {
            stats.errors += 1;
            if e == CellError::Circular {
                stats.circular_references += 1;
            }
            if !options.store_errors {
                continue;
            }
        }
        sheet.set_cached_value_at(cell.row, cell.col, value);
        stats.cells_calculated += 1;
    }

    stats
}
