//! Worksheet type

use std::collections::BTreeMap;

use crate::cell::{CellData, CellRange, CellReference, CellValue};
use crate::drawing::{Image, ImageCollection};
use crate::error::{Error, Result};
use crate::style::Style;

static EMPTY: CellValue = CellValue::Empty;

/// A worksheet (single sheet in a workbook)
///
/// Cells are keyed by 1-based `(row, col)` in a `BTreeMap`, so iteration is
/// always row-major.
#[derive(Debug, Clone, Default)]
pub struct Worksheet {
    /// Sheet name
    name: String,
    /// Non-empty cells
    cells: BTreeMap<(u32, u32), CellData>,
    /// Merged regions, in insertion order
    merged: Vec<CellRange>,
    /// Custom column widths (character units)
    column_widths: BTreeMap<u32, f64>,
    /// Custom row heights (points)
    row_heights: BTreeMap<u32, f64>,
    /// Embedded images
    images: ImageCollection,
}

impl Worksheet {
    /// Default column width in character units
    pub const DEFAULT_COLUMN_WIDTH: f64 = 8.43;
    /// Default row height in points
    pub const DEFAULT_ROW_HEIGHT: f64 = 15.0;

    /// Create a new worksheet with the given name
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Get the sheet name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the sheet name (unchecked; use `Workbook::rename_worksheet`)
    pub(crate) fn set_name<S: Into<String>>(&mut self, name: S) {
        self.name = name.into();
    }

    // === Cell Access ===

    /// Get a cell by address string (e.g., "A1")
    pub fn cell(&self, address: &str) -> Result<Option<&CellData>> {
        let r = CellReference::parse(address)?;
        Ok(self.cells.get(&(r.row, r.col)))
    }

    /// Get a cell by 1-based row and column
    pub fn cell_at(&self, row: u32, col: u32) -> Option<&CellData> {
        self.cells.get(&(row, col))
    }

    /// Get a mutable cell by 1-based row and column
    pub fn cell_at_mut(&mut self, row: u32, col: u32) -> Option<&mut CellData> {
        self.cells.get_mut(&(row, col))
    }

    /// Get a cell value by address (empty for unset cells)
    pub fn get_value(&self, address: &str) -> Result<&CellValue> {
        let r = CellReference::parse(address)?;
        Ok(self.get_value_at(r.row, r.col))
    }

    /// Get a cell value by 1-based row and column (empty for unset cells)
    pub fn get_value_at(&self, row: u32, col: u32) -> &CellValue {
        self.cells
            .get(&(row, col))
            .map(|c| &c.value)
            .unwrap_or(&EMPTY)
    }

    /// Set a cell value by address
    pub fn set_cell_value<V: Into<CellValue>>(&mut self, address: &str, value: V) -> Result<()> {
        let r = CellReference::parse(address)?;
        self.entry(r).value = value.into();
        Ok(())
    }

    /// Set a cell value by 1-based row and column
    pub fn set_cell_value_at<V: Into<CellValue>>(
        &mut self,
        row: u32,
        col: u32,
        value: V,
    ) -> Result<()> {
        let r = CellReference::checked(row, col)?;
        self.entry(r).value = value.into();
        Ok(())
    }

    /// Set a formula (`"=A1+1"` or `"A1+1"`)
    pub fn set_cell_formula(&mut self, address: &str, formula: &str) -> Result<()> {
        self.set_cell_value(address, CellValue::formula(formula))
    }

    /// Set a formula by 1-based row and column
    pub fn set_cell_formula_at(&mut self, row: u32, col: u32, formula: &str) -> Result<()> {
        self.set_cell_value_at(row, col, CellValue::formula(formula))
    }

    /// Store the cached result of a formula cell
    ///
    /// Does nothing if the cell does not hold a formula.
    pub fn set_cached_value_at(&mut self, row: u32, col: u32, value: CellValue) {
        if let Some(CellValue::Formula { cached, .. }) =
            self.cells.get_mut(&(row, col)).map(|c| &mut c.value)
        {
            *cached = Some(Box::new(value));
        }
    }

    /// Set the style of a cell
    pub fn set_cell_style(&mut self, address: &str, style: &Style) -> Result<()> {
        let r = CellReference::parse(address)?;
        self.entry(r).style = Some(style.clone());
        Ok(())
    }

    /// Set the style of a cell by 1-based row and column
    pub fn set_cell_style_at(&mut self, row: u32, col: u32, style: &Style) -> Result<()> {
        let r = CellReference::checked(row, col)?;
        self.entry(r).style = Some(style.clone());
        Ok(())
    }

    /// Get the explicit style of a cell
    pub fn cell_style(&self, address: &str) -> Result<Option<&Style>> {
        Ok(self.cell(address)?.and_then(|c| c.style.as_ref()))
    }

    /// Attach a hyperlink to a cell
    pub fn set_hyperlink<S: Into<String>>(&mut self, address: &str, url: S) -> Result<()> {
        let r = CellReference::parse(address)?;
        self.entry(r).hyperlink = Some(url.into());
        Ok(())
    }

    /// Hyperlink target of a cell
    pub fn hyperlink(&self, address: &str) -> Result<Option<&str>> {
        Ok(self.cell(address)?.and_then(|c| c.hyperlink.as_deref()))
    }

    /// Cells that carry a hyperlink, row-major
    pub fn hyperlinks(&self) -> impl Iterator<Item = (CellReference, &str)> {
        self.cells.iter().filter_map(|(&(row, col), c)| {
            c.hyperlink
                .as_deref()
                .map(|url| (CellReference::new(row, col), url))
        })
    }

    /// Remove a cell entirely
    pub fn clear_cell(&mut self, address: &str) -> Result<()> {
        let r = CellReference::parse(address)?;
        self.cells.remove(&(r.row, r.col));
        Ok(())
    }

    /// Iterate over stored cells, row-major
    pub fn iter_cells(&self) -> impl Iterator<Item = (CellReference, &CellData)> {
        self.cells
            .iter()
            .map(|(&(row, col), data)| (CellReference::new(row, col), data))
    }

    /// Stored cells of one row, left to right
    pub fn row_cells(&self, row: u32) -> impl Iterator<Item = (u32, &CellData)> {
        self.cells
            .range((row, 0)..=(row, u32::MAX))
            .map(|(&(_, col), data)| (col, data))
    }

    /// Rows that contain at least one stored cell, ascending
    pub fn used_rows(&self) -> Vec<u32> {
        let mut rows: Vec<u32> = self.cells.keys().map(|&(row, _)| row).collect();
        rows.dedup();
        rows
    }

    /// Number of stored cells
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Whether the sheet stores no cells
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Smallest range covering every stored cell
    pub fn used_range(&self) -> Option<CellRange> {
        let (&(first_row, _), _) = self.cells.iter().next()?;
        let (&(last_row, _), _) = self.cells.iter().next_back()?;
        let min_col = self.cells.keys().map(|&(_, c)| c).min()?;
        let max_col = self.cells.keys().map(|&(_, c)| c).max()?;
        Some(CellRange::from_indices(first_row, min_col, last_row, max_col))
    }

    fn entry(&mut self, r: CellReference) -> &mut CellData {
        self.cells.entry((r.row, r.col)).or_default()
    }

    // === Rows & Columns ===

    /// Height of a row in points
    pub fn row_height(&self, row: u32) -> f64 {
        self.row_heights
            .get(&row)
            .copied()
            .unwrap_or(Self::DEFAULT_ROW_HEIGHT)
    }

    /// Set a custom row height in points
    pub fn set_row_height(&mut self, row: u32, height: f64) {
        self.row_heights.insert(row, height);
    }

    /// Width of a column in character units
    pub fn column_width(&self, col: u32) -> f64 {
        self.column_widths
            .get(&col)
            .copied()
            .unwrap_or(Self::DEFAULT_COLUMN_WIDTH)
    }

    /// Set a custom column width in character units
    pub fn set_column_width(&mut self, col: u32, width: f64) {
        self.column_widths.insert(col, width);
    }

    /// Custom row heights, by 1-based row
    pub fn custom_row_heights(&self) -> &BTreeMap<u32, f64> {
        &self.row_heights
    }

    /// Custom column widths, by 1-based column
    pub fn custom_column_widths(&self) -> &BTreeMap<u32, f64> {
        &self.column_widths
    }

    // === Merged Cells ===

    /// Get merged regions
    pub fn merged_regions(&self) -> &[CellRange] {
        &self.merged
    }

    /// Merge a range given in A1 notation
    pub fn merge_cells(&mut self, range: &str) -> Result<()> {
        self.merge_range(CellRange::parse(range)?)
    }

    /// Merge a range, rejecting overlap with an existing region
    pub fn merge_range(&mut self, range: CellRange) -> Result<()> {
        if self.merged.iter().any(|m| m.overlaps(&range)) {
            return Err(Error::MergedCellConflict(range.to_string()));
        }
        self.merged.push(range);
        Ok(())
    }

    /// Remove a merged region; returns whether it existed
    pub fn unmerge_cells(&mut self, range: &CellRange) -> bool {
        let before = self.merged.len();
        self.merged.retain(|m| m != range);
        self.merged.len() != before
    }

    // === Images ===

    /// Embedded images
    pub fn images(&self) -> &ImageCollection {
        &self.images
    }

    /// Mutable access to embedded images
    pub fn images_mut(&mut self) -> &mut ImageCollection {
        &mut self.images
    }

    /// Add an image anchored at `cell`; returns its unique name
    pub fn add_image(&mut self, image: Image, cell: &str) -> Result<String> {
        self.images.add_at(image, cell).map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_worksheet() {
        let ws = Worksheet::new("Test");
        assert_eq!(ws.name(), "Test");
        assert!(ws.is_empty());
        assert!(ws.used_range().is_none());
    }

    #[test]
    fn test_set_cell_values() {
        let mut ws = Worksheet::new("Test");

        ws.set_cell_value("A1", "Hello").unwrap();
        ws.set_cell_value("B1", 42.0).unwrap();
        ws.set_cell_value("C1", true).unwrap();

        assert_eq!(ws.get_value("A1").unwrap().as_text(), Some("Hello"));
        assert_eq!(ws.get_value("B1").unwrap().as_number(), Some(42.0));
        assert_eq!(ws.get_value("C1").unwrap(), &CellValue::Boolean(true));
        assert_eq!(ws.get_value("Z99").unwrap(), &CellValue::Empty);
    }

    #[test]
    fn test_set_value_at_checks_bounds() {
        let mut ws = Worksheet::new("Test");
        assert!(ws.set_cell_value_at(0, 1, 1.0).is_err());
        assert!(ws.set_cell_value_at(1, 16_385, 1.0).is_err());
        assert!(ws.set_cell_value_at(1, 1, 1.0).is_ok());
    }

    #[test]
    fn test_formula_and_cached_value() {
        let mut ws = Worksheet::new("Test");
        ws.set_cell_formula("A1", "SUM(B1:B10)").unwrap();
        ws.set_cached_value_at(1, 1, CellValue::Number(3.0));

        let value = ws.get_value("A1").unwrap();
        assert_eq!(value.formula_text(), Some("=SUM(B1:B10)"));
        assert_eq!(value.cached_value(), Some(&CellValue::Number(3.0)));
    }

    #[test]
    fn test_row_major_iteration() {
        let mut ws = Worksheet::new("Test");
        ws.set_cell_value("B2", 4.0).unwrap();
        ws.set_cell_value("A2", 3.0).unwrap();
        ws.set_cell_value("B1", 2.0).unwrap();
        ws.set_cell_value("A1", 1.0).unwrap();

        let order: Vec<String> = ws.iter_cells().map(|(r, _)| r.to_a1_string()).collect();
        assert_eq!(order, vec!["A1", "B1", "A2", "B2"]);
        assert_eq!(ws.used_rows(), vec![1, 2]);
        assert_eq!(ws.row_cells(2).count(), 2);
        assert_eq!(ws.used_range().unwrap().to_a1_string(), "A1:B2");
    }

    #[test]
    fn test_merge_rejects_overlap() {
        let mut ws = Worksheet::new("Test");
        ws.merge_cells("A1:B2").unwrap();
        assert!(ws.merge_cells("B2:C3").is_err());
        ws.merge_cells("D1:E1").unwrap();
        assert_eq!(ws.merged_regions().len(), 2);
        assert!(ws.unmerge_cells(&CellRange::parse("A1:B2").unwrap()));
    }

    #[test]
    fn test_hyperlinks() {
        let mut ws = Worksheet::new("Test");
        ws.set_cell_value("A1", "Docs").unwrap();
        ws.set_hyperlink("A1", "https://example.com").unwrap();
        assert_eq!(ws.hyperlink("A1").unwrap(), Some("https://example.com"));
        assert_eq!(ws.hyperlinks().count(), 1);
    }

    #[test]
    fn test_dimensions() {
        let mut ws = Worksheet::new("Test");
        ws.set_column_width(2, 20.0);
        ws.set_row_height(3, 30.0);
        assert_eq!(ws.column_width(2), 20.0);
        assert_eq!(ws.column_width(1), Worksheet::DEFAULT_COLUMN_WIDTH);
        assert_eq!(ws.row_height(3), 30.0);
    }
}
