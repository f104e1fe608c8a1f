use thiserror::Error;

use crate::scope::SubUnitId;

/// Malformed structural edit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("structural edit on '{sub_unit}' has a zero count")]
    EmptyCount { sub_unit: SubUnitId },
    #[error("move target {to} lies inside the moved block {start}..{end}")]
    TargetInsideBlock { to: u32, start: u32, end: u32 },
    #[error("structural edit on '{sub_unit}' at {start} with count {count} runs past the last grid index")]
    OutOfBounds {
        sub_unit: SubUnitId,
        start: u32,
        count: u32,
    },
}
