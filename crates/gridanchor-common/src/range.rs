use serde::{Deserialize, Serialize};

use crate::position::Position;

/// Inclusive, zero-based rectangle on one sub-unit grid.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridRange {
    pub start_row: u32,
    pub start_col: u32,
    pub end_row: u32,
    pub end_col: u32,
}

impl GridRange {
    pub fn new(
        start_row: u32,
        start_col: u32,
        end_row: u32,
        end_col: u32,
    ) -> Result<Self, &'static str> {
        if start_row > end_row || start_col > end_col {
            return Err("Range must be ordered: start <= end");
        }
        Ok(Self {
            start_row,
            start_col,
            end_row,
            end_col,
        })
    }

    /// Single-cell range.
    pub fn cell(row: u32, col: u32) -> Self {
        Self {
            start_row: row,
            start_col: col,
            end_row: row,
            end_col: col,
        }
    }

    /// Range spanning two corners given in any order.
    pub fn from_corners(row_start: u32, row_end: u32, col_start: u32, col_end: u32) -> Self {
        Self {
            start_row: row_start.min(row_end),
            start_col: col_start.min(col_end),
            end_row: row_start.max(row_end),
            end_col: col_start.max(col_end),
        }
    }

    pub fn width(&self) -> u32 {
        self.end_col - self.start_col + 1
    }

    pub fn height(&self) -> u32 {
        self.end_row - self.start_row + 1
    }

    pub fn contains(&self, row: u32, col: u32) -> bool {
        row >= self.start_row && row <= self.end_row && col >= self.start_col && col <= self.end_col
    }

    /// Top-left cell as a cache position; `None` past [`MAX_GRID_INDEX`](crate::MAX_GRID_INDEX).
    pub fn origin(&self) -> Option<Position> {
        Position::from_cell(self.start_row, self.start_col)
    }

    pub fn row_indices(&self) -> impl Iterator<Item = u32> {
        self.start_row..=self.end_row
    }
}
