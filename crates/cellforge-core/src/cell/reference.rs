//! Cell reference and range types

use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};
use std::fmt;
use std::str::FromStr;

/// A cell reference (e.g., "A1", "$B$2")
///
/// Rows and columns are 1-based, exactly as they appear in A1 notation:
/// `A1` is `(row 1, col 1)` and `AA10` is `(row 10, col 27)`.
/// The optional `$` prefix marks the row or column as absolute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellReference {
    /// Row number (1-based)
    pub row: u32,
    /// Column number (1-based, A=1, B=2, ..., XFD=16384)
    pub col: u32,
    /// Whether the row reference is absolute ($)
    pub row_absolute: bool,
    /// Whether the column reference is absolute ($)
    pub col_absolute: bool,
}

impl CellReference {
    /// Create a new cell reference with relative row and column
    pub fn new(row: u32, col: u32) -> Self {
        Self {
            row,
            col,
            row_absolute: false,
            col_absolute: false,
        }
    }

    /// Create a new cell reference with specified absolute/relative flags
    pub fn with_absolute(row: u32, col: u32, row_absolute: bool, col_absolute: bool) -> Self {
        Self {
            row,
            col,
            row_absolute,
            col_absolute,
        }
    }

    /// Create a cell reference, checking that both coordinates are on the grid
    pub fn checked(row: u32, col: u32) -> Result<Self> {
        if row == 0 || row > MAX_ROWS {
            return Err(Error::RowOutOfBounds(row, MAX_ROWS));
        }
        if col == 0 || col > MAX_COLS {
            return Err(Error::ColumnOutOfBounds(col, MAX_COLS));
        }
        Ok(Self::new(row, col))
    }

    /// Parse a cell reference from A1-style notation
    ///
    /// # Examples
    /// ```
    /// use cellforge_core::CellReference;
    ///
    /// let r = CellReference::parse("A1").unwrap();
    /// assert_eq!((r.row, r.col), (1, 1));
    ///
    /// let r = CellReference::parse("$AA$10").unwrap();
    /// assert_eq!((r.row, r.col), (10, 27));
    /// assert!(r.row_absolute && r.col_absolute);
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::InvalidAddress("empty address".into()));
        }

        let bytes = s.as_bytes();
        let mut pos = 0;

        let col_absolute = if bytes.get(pos) == Some(&b'$') {
            pos += 1;
            true
        } else {
            false
        };

        let col_start = pos;
        while pos < bytes.len() && bytes[pos].is_ascii_alphabetic() {
            pos += 1;
        }
        if pos == col_start {
            return Err(Error::InvalidAddress(format!(
                "no column letters in '{}'",
                s
            )));
        }
        let col = Self::letters_to_column(&s[col_start..pos])?;

        let row_absolute = if bytes.get(pos) == Some(&b'$') {
            pos += 1;
            true
        } else {
            false
        };

        let row_str = &s[pos..];
        if row_str.is_empty() || !row_str.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidAddress(format!("invalid row number in '{}'", s)));
        }
        let row: u32 = row_str
            .parse()
            .map_err(|_| Error::InvalidAddress(format!("invalid row number in '{}'", s)))?;

        if row == 0 || row > MAX_ROWS {
            return Err(Error::RowOutOfBounds(row, MAX_ROWS));
        }

        Ok(Self {
            row,
            col,
            row_absolute,
            col_absolute,
        })
    }

    /// Convert a 1-based column number to letters (1 = A, 26 = Z, 27 = AA)
    pub fn column_to_letters(col: u32) -> String {
        let mut result = Vec::new();
        let mut n = col;

        while n > 0 {
            n -= 1;
            result.push((n % 26) as u8 + b'A');
            n /= 26;
        }

        result.reverse();
        String::from_utf8(result).unwrap_or_default()
    }

    /// Convert column letters to a 1-based column number (A = 1, Z = 26, AA = 27)
    pub fn letters_to_column(letters: &str) -> Result<u32> {
        if letters.is_empty() {
            return Err(Error::InvalidAddress("empty column letters".into()));
        }

        let mut col: u32 = 0;
        for c in letters.chars() {
            if !c.is_ascii_alphabetic() {
                return Err(Error::InvalidAddress(format!(
                    "invalid column letter '{}'",
                    c
                )));
            }
            col = col * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
            if col > MAX_COLS {
                return Err(Error::ColumnOutOfBounds(col, MAX_COLS));
            }
        }

        Ok(col)
    }

    /// Format as A1-style string, keeping `$` markers
    pub fn to_a1_string(&self) -> String {
        let mut result = String::new();

        if self.col_absolute {
            result.push('$');
        }
        result.push_str(&Self::column_to_letters(self.col));

        if self.row_absolute {
            result.push('$');
        }
        result.push_str(&self.row.to_string());

        result
    }

    /// The same cell with both absolute markers cleared
    ///
    /// Two references to the same cell compare equal once relative.
    pub fn to_relative(&self) -> Self {
        Self::new(self.row, self.col)
    }

    /// Create a range from this reference to another
    pub fn to(&self, other: CellReference) -> CellRange {
        CellRange::new(*self, other)
    }
}

impl fmt::Display for CellReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_a1_string())
    }
}

impl FromStr for CellReference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A rectangular range of cells (e.g., "A1:B10")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRange {
    /// Top-left corner
    pub start: CellReference,
    /// Bottom-right corner
    pub end: CellReference,
}

impl CellRange {
    /// Create a new cell range, normalising the corners
    pub fn new(start: CellReference, end: CellReference) -> Self {
        let (start_row, end_row) = if start.row <= end.row {
            (start.row, end.row)
        } else {
            (end.row, start.row)
        };

        let (start_col, end_col) = if start.col <= end.col {
            (start.col, end.col)
        } else {
            (end.col, start.col)
        };

        Self {
            start: CellReference::with_absolute(
                start_row,
                start_col,
                start.row_absolute,
                start.col_absolute,
            ),
            end: CellReference::with_absolute(end_row, end_col, end.row_absolute, end.col_absolute),
        }
    }

    /// Create a range from 1-based row/column numbers
    pub fn from_indices(start_row: u32, start_col: u32, end_row: u32, end_col: u32) -> Self {
        Self::new(
            CellReference::new(start_row, start_col),
            CellReference::new(end_row, end_col),
        )
    }

    /// Create a single-cell range
    pub fn single(r: CellReference) -> Self {
        Self { start: r, end: r }
    }

    /// Parse a range from A1:B10 notation (a lone cell is a one-cell range)
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();

        match s.split_once(':') {
            Some((a, b)) => {
                let start = CellReference::parse(a)
                    .map_err(|_| Error::InvalidRange(s.to_string()))?;
                let end = CellReference::parse(b)
                    .map_err(|_| Error::InvalidRange(s.to_string()))?;
                Ok(Self::new(start, end))
            }
            None => Ok(Self::single(CellReference::parse(s)?)),
        }
    }

    /// Check if a cell is within this range
    pub fn contains(&self, r: &CellReference) -> bool {
        r.row >= self.start.row
            && r.row <= self.end.row
            && r.col >= self.start.col
            && r.col <= self.end.col
    }

    /// Number of rows in the range
    pub fn row_count(&self) -> u32 {
        self.end.row - self.start.row + 1
    }

    /// Number of columns in the range
    pub fn col_count(&self) -> u32 {
        self.end.col - self.start.col + 1
    }

    /// Total number of cells in the range
    pub fn cell_count(&self) -> u64 {
        self.row_count() as u64 * self.col_count() as u64
    }

    /// Check if this range overlaps with another
    pub fn overlaps(&self, other: &CellRange) -> bool {
        self.start.row <= other.end.row
            && self.end.row >= other.start.row
            && self.start.col <= other.end.col
            && self.end.col >= other.start.col
    }

    /// Iterate over all cell references in the range, row by row
    pub fn cells(&self) -> CellRangeIter {
        CellRangeIter {
            range: *self,
            current_row: self.start.row,
            current_col: self.start.col,
            remaining: self.cell_count(),
        }
    }

    /// Format as A1:B10 string (without `$` markers)
    pub fn to_a1_string(&self) -> String {
        let start = self.start.to_relative();
        let end = self.end.to_relative();
        if start == end {
            start.to_a1_string()
        } else {
            format!("{}:{}", start.to_a1_string(), end.to_a1_string())
        }
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_a1_string())
    }
}

impl FromStr for CellRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Row-major iterator over the cells of a [`CellRange`]
pub struct CellRangeIter {
    range: CellRange,
    current_row: u32,
    current_col: u32,
    remaining: u64,
}

impl Iterator for CellRangeIter {
    type Item = CellReference;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let r = CellReference::new(self.current_row, self.current_col);
        self.remaining -= 1;

        self.current_col += 1;
        if self.current_col > self.range.end.col {
            self.current_col = self.range.start.col;
            self.current_row += 1;
        }

        Some(r)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for CellRangeIter {}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_column_to_letters() {
        assert_eq!(CellReference::column_to_letters(1), "A");
        assert_eq!(CellReference::column_to_letters(26), "Z");
        assert_eq!(CellReference::column_to_letters(27), "AA");
        assert_eq!(CellReference::column_to_letters(28), "AB");
        assert_eq!(CellReference::column_to_letters(702), "ZZ");
        assert_eq!(CellReference::column_to_letters(703), "AAA");
        assert_eq!(CellReference::column_to_letters(16384), "XFD");
    }

    #[test]
    fn test_letters_to_column() {
        assert_eq!(CellReference::letters_to_column("A").unwrap(), 1);
        assert_eq!(CellReference::letters_to_column("z").unwrap(), 26);
        assert_eq!(CellReference::letters_to_column("AA").unwrap(), 27);
        assert_eq!(CellReference::letters_to_column("XFD").unwrap(), 16384);
        assert!(CellReference::letters_to_column("XFE").is_err());
        assert!(CellReference::letters_to_column("").is_err());
    }

    #[test]
    fn test_parse_reference() {
        let r = CellReference::parse("A1").unwrap();
        assert_eq!((r.row, r.col), (1, 1));

        let r = CellReference::parse("AA10").unwrap();
        assert_eq!((r.row, r.col), (10, 27));

        let r = CellReference::parse("$C5").unwrap();
        assert!(r.col_absolute);
        assert!(!r.row_absolute);
        assert_eq!(r.to_a1_string(), "$C5");
    }

    #[test]
    fn test_parse_invalid() {
        assert!(CellReference::parse("").is_err());
        assert!(CellReference::parse("1A").is_err());
        assert!(CellReference::parse("A0").is_err());
        assert!(CellReference::parse("A").is_err());
        assert!(CellReference::parse("A1B").is_err());
        assert!(CellReference::parse("A1048577").is_err());
    }

    #[test]
    fn test_range_normalises_corners() {
        let range = CellRange::parse("C3:A1").unwrap();
        assert_eq!(range.to_a1_string(), "A1:C3");
        assert_eq!(range.cell_count(), 9);
        assert!(range.contains(&CellReference::new(2, 2)));
        assert!(!range.contains(&CellReference::new(4, 1)));
    }

    #[test]
    fn test_range_iterates_row_major() {
        let range = CellRange::parse("A1:B2").unwrap();
        let cells: Vec<String> = range.cells().map(|c| c.to_a1_string()).collect();
        assert_eq!(cells, vec!["A1", "B1", "A2", "B2"]);
    }

    proptest! {
        #[test]
        fn reference_round_trips(row in 1u32..=crate::MAX_ROWS, col in 1u32..=crate::MAX_COLS) {
            let text = CellReference::new(row, col).to_a1_string();
            let parsed = CellReference::parse(&text).unwrap();
            prop_assert_eq!((parsed.row, parsed.col), (row, col));
        }
    }
}
