use crate::cell::CellReference;
use crate::error::Result;
use crate::{MAX_COLS, MAX_ROWS};

/// Placement of an image relative to the grid
///
/// Offsets are `(x, y)` pixels from the top-left corner of the anchor cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anchor {
    /// Top-left corner pinned to a cell; size comes from the image extent
    OneCell {
        from: CellReference,
        from_offset: (u32, u32),
    },
    /// Stretched between two cells
    TwoCell {
        from: CellReference,
        from_offset: (u32, u32),
        to: CellReference,
        to_offset: (u32, u32),
    },
    /// Fixed position on the sheet, independent of cells
    Absolute { x: u32, y: u32 },
}

impl Anchor {
    /// Rows spanned by [`Anchor::at_cell`]
    pub const DEFAULT_ROW_SPAN: u32 = 5;
    /// Columns spanned by [`Anchor::at_cell`]
    pub const DEFAULT_COL_SPAN: u32 = 3;

    /// Pin the top-left corner to a cell
    pub fn one_cell(from: CellReference) -> Self {
        Anchor::OneCell {
            from,
            from_offset: (0, 0),
        }
    }

    /// Two-cell anchor starting at `cell` with the default span, clipped to the grid
    pub fn at_cell(cell: &str) -> Result<Self> {
        let from = CellReference::parse(cell)?.to_relative();
        let to = CellReference::new(
            from.row.saturating_add(Self::DEFAULT_ROW_SPAN).min(MAX_ROWS),
            from.col.saturating_add(Self::DEFAULT_COL_SPAN).min(MAX_COLS),
        );
        Ok(Anchor::TwoCell {
            from,
            from_offset: (0, 0),
            to,
            to_offset: (0, 0),
        })
    }

    /// Two-cell anchor covering `start` to `end`
    pub fn from_range(start: &str, end: &str) -> Result<Self> {
        Ok(Anchor::TwoCell {
            from: CellReference::parse(start)?.to_relative(),
            from_offset: (0, 0),
            to: CellReference::parse(end)?.to_relative(),
            to_offset: (0, 0),
        })
    }

    /// Absolute position in pixels
    pub fn absolute(x: u32, y: u32) -> Self {
        Anchor::Absolute { x, y }
    }

    /// Cell holding the top-left corner, if the anchor is cell-based
    pub fn from_cell(&self) -> Option<CellReference> {
        match self {
            Anchor::OneCell { from, .. } | Anchor::TwoCell { from, .. } => Some(*from),
            Anchor::Absolute { .. } => None,
        }
    }

    /// Whether the anchor starts at, or spans over, `cell`
    pub fn covers(&self, cell: &CellReference) -> bool {
        match self {
            Anchor::OneCell { from, .. } => from.row == cell.row && from.col == cell.col,
            Anchor::TwoCell { from, to, .. } => from.to(*to).contains(cell),
            Anchor::Absolute { .. } => false,
        }
    }
}

impl Default for Anchor {
    fn default() -> Self {
        Anchor::one_cell(CellReference::new(1, 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_at_cell_default_span() {
        let anchor = Anchor::at_cell("B2").unwrap();
        match &anchor {
            Anchor::TwoCell { from, to, .. } => {
                assert_eq!((from.row, from.col), (2, 2));
                assert_eq!((to.row, to.col), (7, 5));
            }
            other => panic!("unexpected anchor {:?}", other),
        }
        assert!(anchor.covers(&CellReference::new(3, 3)));
        assert!(!anchor.covers(&CellReference::new(1, 1)));
    }

    #[test]
    fn test_at_cell_clipped_to_grid() {
        let cases = [("XFD1048576", (1_048_576, 16_384)), ("XFB1048573", (1_048_576, 16_384))];
        for (cell, end) in cases {
            match Anchor::at_cell(cell).unwrap() {
                Anchor::TwoCell { to, .. } => assert_eq!((to.row, to.col), end),
                other => panic!("unexpected anchor {:?}", other),
            }
        }
    }

    #[test]
    fn test_absolute_has_no_cell() {
        assert_eq!(Anchor::absolute(10, 20).from_cell(), None);
        assert!(Anchor::at_cell("not a cell").is_err());
    }
}
