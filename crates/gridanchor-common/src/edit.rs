//! Structural edits and their coordinate shift rules.
//!
//! Every watched range, cached anchor and selection is rebased through
//! [`StructuralEdit::adjust_range`], so all consumers agree on where a cell ends
//! up after rows or columns are inserted, deleted or moved.

use serde::{Deserialize, Serialize};

use crate::error::EditError;
use crate::position::MAX_GRID_INDEX;
use crate::range::GridRange;
use crate::scope::SubUnitId;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Axis {
    Row,
    Column,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum StructuralEdit {
    InsertRows {
        sub_unit: SubUnitId,
        before: u32,
        count: u32,
    },
    DeleteRows {
        sub_unit: SubUnitId,
        start: u32,
        count: u32,
    },
    InsertColumns {
        sub_unit: SubUnitId,
        before: u32,
        count: u32,
    },
    DeleteColumns {
        sub_unit: SubUnitId,
        start: u32,
        count: u32,
    },
    /// Move `count` rows starting at `start` so they land before row `to`
    /// (`to` is expressed in pre-move coordinates).
    MoveRows {
        sub_unit: SubUnitId,
        start: u32,
        count: u32,
        to: u32,
    },
    MoveColumns {
        sub_unit: SubUnitId,
        start: u32,
        count: u32,
        to: u32,
    },
}

/// Axis-independent form of an edit.
#[derive(Copy, Clone, Debug)]
enum Shift {
    Insert { before: u32, count: u32 },
    Delete { start: u32, count: u32 },
    Move { start: u32, count: u32, to: u32 },
}

impl StructuralEdit {
    pub fn sub_unit(&self) -> &SubUnitId {
        match self {
            StructuralEdit::InsertRows { sub_unit, .. }
            | StructuralEdit::DeleteRows { sub_unit, .. }
            | StructuralEdit::InsertColumns { sub_unit, .. }
            | StructuralEdit::DeleteColumns { sub_unit, .. }
            | StructuralEdit::MoveRows { sub_unit, .. }
            | StructuralEdit::MoveColumns { sub_unit, .. } => sub_unit,
        }
    }

    pub fn axis(&self) -> Axis {
        match self {
            StructuralEdit::InsertRows { .. }
            | StructuralEdit::DeleteRows { .. }
            | StructuralEdit::MoveRows { .. } => Axis::Row,
            _ => Axis::Column,
        }
    }

    fn shift(&self) -> Shift {
        match *self {
            StructuralEdit::InsertRows { before, count, .. }
            | StructuralEdit::InsertColumns { before, count, .. } => Shift::Insert { before, count },
            StructuralEdit::DeleteRows { start, count, .. }
            | StructuralEdit::DeleteColumns { start, count, .. } => Shift::Delete { start, count },
            StructuralEdit::MoveRows {
                start, count, to, ..
            }
            | StructuralEdit::MoveColumns {
                start, count, to, ..
            } => Shift::Move { start, count, to },
        }
    }

    /// Reject edits that cannot be applied to a grid.
    pub fn validate(&self) -> Result<(), EditError> {
        let shift = self.shift();
        let (start, count) = match shift {
            Shift::Insert { before, count } => (before, count),
            Shift::Delete { start, count } | Shift::Move { start, count, .. } => (start, count),
        };
        if count == 0 {
            return Err(EditError::EmptyCount {
                sub_unit: self.sub_unit().clone(),
            });
        }
        // One past the last touched index may equal MAX_GRID_INDEX + 1.
        let in_grid = start
            .checked_add(count)
            .is_some_and(|end| end - 1 <= MAX_GRID_INDEX);
        let target_in_grid = match shift {
            Shift::Move { to, .. } => to <= MAX_GRID_INDEX + 1,
            _ => true,
        };
        if !in_grid || !target_in_grid {
            return Err(EditError::OutOfBounds {
                sub_unit: self.sub_unit().clone(),
                start,
                count,
            });
        }
        match shift {
            Shift::Move { start, count, to } if to > start && to < start + count => {
                Err(EditError::TargetInsideBlock {
                    to,
                    start,
                    end: start + count,
                })
            }
            _ => Ok(()),
        }
    }

    /// Where a single row/column index on the edit's axis ends up.
    /// Returns `None` if the index was deleted.
    pub fn adjust_index(&self, index: u32) -> Option<u32> {
        self.shift().map_index(index)
    }

    /// Rebase a range on the edit's sub-unit. Returns `None` when the edit
    /// removes every row (or column) the range covered.
    pub fn adjust_range(&self, range: &GridRange) -> Option<GridRange> {
        let shift = self.shift();
        match self.axis() {
            Axis::Row => {
                let (start_row, end_row) = shift.map_span(range.start_row, range.end_row)?;
                Some(GridRange {
                    start_row,
                    end_row,
                    ..*range
                })
            }
            Axis::Column => {
                let (start_col, end_col) = shift.map_span(range.start_col, range.end_col)?;
                Some(GridRange {
                    start_col,
                    end_col,
                    ..*range
                })
            }
        }
    }
}

/// `i + count`, or `None` once it leaves the grid.
fn pushed(i: u32, count: u32) -> Option<u32> {
    i.checked_add(count).filter(|&v| v <= MAX_GRID_INDEX)
}

impl Shift {
    /// `None` when the index is deleted or pushed past [`MAX_GRID_INDEX`].
    fn map_index(self, i: u32) -> Option<u32> {
        match self {
            Shift::Insert { before, count } => {
                if i >= before {
                    pushed(i, count)
                } else {
                    Some(i)
                }
            }
            Shift::Delete { start, count } => {
                let end = start.saturating_add(count);
                if i >= start && i < end {
                    None
                } else if i >= end {
                    Some(i - count)
                } else {
                    Some(i)
                }
            }
            Shift::Move { start, count, to } => {
                let end = start.saturating_add(count);
                let moved = i >= start && i < end;
                if to <= start {
                    if moved {
                        Some(to + (i - start))
                    } else if i >= to && i < start {
                        pushed(i, count)
                    } else {
                        Some(i)
                    }
                } else if to >= end {
                    if moved {
                        Some(to - count + (i - start))
                    } else if i >= end && i < to {
                        Some(i - count)
                    } else {
                        Some(i)
                    }
                } else {
                    // Rejected by validate(); treat as no-op.
                    Some(i)
                }
            }
        }
    }

    fn map_span(self, lo: u32, hi: u32) -> Option<(u32, u32)> {
        match self {
            Shift::Insert { .. } => {
                // A range partly pushed off the grid keeps the part that is left.
                let lo = self.map_index(lo)?;
                Some((lo, self.map_index(hi).unwrap_or(MAX_GRID_INDEX)))
            }
            Shift::Delete { start, count } => {
                let end = start.saturating_add(count);
                if hi < start || lo >= end {
                    Some((self.map_index(lo)?, self.map_index(hi)?))
                } else if lo >= start && hi < end {
                    None
                } else {
                    let adj_lo = lo.min(start);
                    let adj_hi = if hi >= end { hi - count } else { start - 1 };
                    Some((adj_lo, adj_hi))
                }
            }
            Shift::Move { start, count, to } => {
                // The move is monotone between its split points, so the image of
                // [lo, hi] is bounded by the images of the piece endpoints.
                let mut candidates = vec![lo, hi];
                for p in [start, start.saturating_add(count), to] {
                    if p > lo && p <= hi {
                        candidates.push(p - 1);
                        candidates.push(p);
                    }
                }
                let mapped: Vec<u32> = candidates
                    .into_iter()
                    .filter_map(|i| self.map_index(i))
                    .collect();
                Some((*mapped.iter().min()?, *mapped.iter().max()?))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet() -> SubUnitId {
        SubUnitId::from("sheet1")
    }

    #[test]
    fn insert_rows_shifts_ranges_at_or_below_insert_point() {
        let edit = StructuralEdit::InsertRows {
            sub_unit: sheet(),
            before: 2,
            count: 3,
        };
        assert_eq!(
            edit.adjust_range(&GridRange::cell(2, 3)),
            Some(GridRange::cell(5, 3))
        );
        assert_eq!(
            edit.adjust_range(&GridRange::cell(1, 3)),
            Some(GridRange::cell(1, 3))
        );
        // Range straddling the insert point grows.
        let grown = edit.adjust_range(&GridRange::from_corners(1, 4, 0, 0)).unwrap();
        assert_eq!((grown.start_row, grown.end_row), (1, 7));
    }

    #[test]
    fn delete_rows_collapses_fully_consumed_range() {
        let edit = StructuralEdit::DeleteRows {
            sub_unit: sheet(),
            start: 2,
            count: 1,
        };
        assert_eq!(edit.adjust_range(&GridRange::cell(2, 3)), None);
        assert_eq!(
            edit.adjust_range(&GridRange::cell(4, 3)),
            Some(GridRange::cell(3, 3))
        );
        assert_eq!(
            edit.adjust_range(&GridRange::cell(0, 3)),
            Some(GridRange::cell(0, 3))
        );
    }

    #[test]
    fn delete_rows_shrinks_partial_overlap() {
        let edit = StructuralEdit::DeleteRows {
            sub_unit: sheet(),
            start: 3,
            count: 4,
        };
        let top = edit.adjust_range(&GridRange::from_corners(1, 4, 0, 0)).unwrap();
        assert_eq!((top.start_row, top.end_row), (1, 2));
        let bottom = edit.adjust_range(&GridRange::from_corners(5, 9, 0, 0)).unwrap();
        assert_eq!((bottom.start_row, bottom.end_row), (3, 5));
        let spanning = edit.adjust_range(&GridRange::from_corners(2, 8, 0, 0)).unwrap();
        assert_eq!((spanning.start_row, spanning.end_row), (2, 4));
    }

    #[test]
    fn column_edits_leave_rows_alone() {
        let edit = StructuralEdit::DeleteColumns {
            sub_unit: sheet(),
            start: 0,
            count: 2,
        };
        assert_eq!(
            edit.adjust_range(&GridRange::cell(7, 5)),
            Some(GridRange::cell(7, 3))
        );
        assert_eq!(edit.adjust_range(&GridRange::cell(7, 1)), None);

        let insert = StructuralEdit::InsertColumns {
            sub_unit: sheet(),
            before: 0,
            count: 1,
        };
        assert_eq!(
            insert.adjust_range(&GridRange::cell(7, 0)),
            Some(GridRange::cell(7, 1))
        );
    }

    #[test]
    fn move_rows_up_and_down() {
        // Rows 5..7 moved before row 1.
        let up = StructuralEdit::MoveRows {
            sub_unit: sheet(),
            start: 5,
            count: 2,
            to: 1,
        };
        assert_eq!(up.adjust_index(5), Some(1));
        assert_eq!(up.adjust_index(6), Some(2));
        assert_eq!(up.adjust_index(1), Some(3));
        assert_eq!(up.adjust_index(4), Some(6));
        assert_eq!(up.adjust_index(0), Some(0));
        assert_eq!(up.adjust_index(7), Some(7));

        // Rows 1..3 moved before row 6.
        let down = StructuralEdit::MoveRows {
            sub_unit: sheet(),
            start: 1,
            count: 2,
            to: 6,
        };
        assert_eq!(down.adjust_index(1), Some(4));
        assert_eq!(down.adjust_index(2), Some(5));
        assert_eq!(down.adjust_index(3), Some(1));
        assert_eq!(down.adjust_index(5), Some(3));
        assert_eq!(down.adjust_index(6), Some(6));
    }

    #[test]
    fn move_span_is_bounding_box_of_image() {
        let up = StructuralEdit::MoveRows {
            sub_unit: sheet(),
            start: 5,
            count: 2,
            to: 1,
        };
        // Rows 4..=5: row 4 -> 6, row 5 -> 1.
        let r = up.adjust_range(&GridRange::from_corners(4, 5, 0, 0)).unwrap();
        assert_eq!((r.start_row, r.end_row), (1, 6));
    }

    #[test]
    fn validate_rejects_degenerate_edits() {
        let empty = StructuralEdit::InsertRows {
            sub_unit: sheet(),
            before: 0,
            count: 0,
        };
        assert!(matches!(empty.validate(), Err(EditError::EmptyCount { .. })));

        let inside = StructuralEdit::MoveColumns {
            sub_unit: sheet(),
            start: 2,
            count: 3,
            to: 3,
        };
        assert!(matches!(
            inside.validate(),
            Err(EditError::TargetInsideBlock { .. })
        ));
    }

    #[test]
    fn validate_rejects_edits_running_off_the_grid() {
        let huge = StructuralEdit::InsertRows {
            sub_unit: sheet(),
            before: 0,
            count: u32::MAX,
        };
        assert!(matches!(huge.validate(), Err(EditError::OutOfBounds { .. })));

        let wraps = StructuralEdit::DeleteColumns {
            sub_unit: sheet(),
            start: u32::MAX,
            count: 2,
        };
        assert!(matches!(wraps.validate(), Err(EditError::OutOfBounds { .. })));

        let last_row = StructuralEdit::DeleteRows {
            sub_unit: sheet(),
            start: MAX_GRID_INDEX,
            count: 1,
        };
        assert_eq!(last_row.validate(), Ok(()));
        let past_last_row = StructuralEdit::InsertRows {
            sub_unit: sheet(),
            before: MAX_GRID_INDEX,
            count: 2,
        };
        assert!(past_last_row.validate().is_err());
    }

    #[test]
    fn indices_pushed_off_the_grid_collapse() {
        let insert = StructuralEdit::InsertRows {
            sub_unit: sheet(),
            before: 0,
            count: 1,
        };
        assert_eq!(insert.adjust_index(MAX_GRID_INDEX), None);
        assert_eq!(insert.adjust_range(&GridRange::cell(MAX_GRID_INDEX, 0)), None);
        let tail = insert
            .adjust_range(&GridRange::from_corners(MAX_GRID_INDEX - 1, MAX_GRID_INDEX, 0, 0))
            .unwrap();
        assert_eq!((tail.start_row, tail.end_row), (MAX_GRID_INDEX, MAX_GRID_INDEX));

        // Unvalidated edits never panic.
        let huge = StructuralEdit::InsertRows {
            sub_unit: sheet(),
            before: 0,
            count: u32::MAX,
        };
        assert_eq!(huge.adjust_range(&GridRange::cell(2, 3)), None);
        let wide = StructuralEdit::DeleteRows {
            sub_unit: sheet(),
            start: 10,
            count: u32::MAX,
        };
        assert_eq!(wide.adjust_index(3), Some(3));
        assert_eq!(wide.adjust_index(20), None);
    }

    #[test]
    fn edits_round_trip_through_json_params() {
        let edit = StructuralEdit::DeleteRows {
            sub_unit: sheet(),
            start: 2,
            count: 1,
        };
        let value = serde_json::to_value(&edit).unwrap();
        assert_eq!(value["kind"], "deleteRows");
        let back: StructuralEdit = serde_json::from_value(value).unwrap();
        assert_eq!(back, edit);
    }
}
