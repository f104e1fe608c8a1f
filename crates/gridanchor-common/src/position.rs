//! Grid positions used by the resource cache.
//!
//! `Position` is a zero-based `(row, col)` pair. Negative components are not a
//! valid grid cell; the canonical `(-1, -1)` value marks an entry that is still
//! addressable by key but no longer anchored anywhere on the grid.

use core::fmt;

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub row: i32,
    pub col: i32,
}

/// Largest row or column index a [`Position`] can anchor to.
pub const MAX_GRID_INDEX: u32 = i32::MAX as u32;

impl Position {
    pub const DETACHED: Self = Self { row: -1, col: -1 };

    #[inline(always)]
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// Normalise any position with a negative component to [`Position::DETACHED`].
    #[inline(always)]
    pub fn normalized(row: i32, col: i32) -> Self {
        if row < 0 || col < 0 {
            Self::DETACHED
        } else {
            Self { row, col }
        }
    }

    #[inline(always)]
    pub fn is_detached(self) -> bool {
        self.row < 0 || self.col < 0
    }

    /// Returns the position as unsigned grid indices, or `None` when detached.
    #[inline(always)]
    pub fn cell(self) -> Option<(u32, u32)> {
        if self.is_detached() {
            None
        } else {
            Some((self.row.unsigned_abs(), self.col.unsigned_abs()))
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::DETACHED
    }
}

impl Position {
    /// Position of a grid cell, or `None` when either index is past
    /// [`MAX_GRID_INDEX`].
    pub fn from_cell(row: u32, col: u32) -> Option<Self> {
        Some(Self {
            row: i32::try_from(row).ok()?,
            col: i32::try_from(col).ok()?,
        })
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_detached() {
            f.write_str("(detached)")
        } else {
            write!(f, "({}, {})", self.row, self.col)
        }
    }
}
