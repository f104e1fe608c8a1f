//! Meta crate that re-exports the gridanchor building blocks and wires them
//! together. [`Workbench`] routes every command through one bus, feeds the
//! post-execution notifications to the range watches of the resource cache, and
//! carries the auto-fit undo/redo synthesizer. The underlying crates stay
//! reachable for callers that need to assemble the pieces differently.

pub use gridanchor_cache as cache;
pub use gridanchor_command as command;
pub use gridanchor_common as common;

pub use gridanchor_cache::{
    CacheConfig, ContentStore, EntryDescriptor, LoadError, LoadState, LoadedResource, NoRepaint,
    ObserveOutcome, RepaintHook, ResourceCacheService,
};
pub use gridanchor_command::{
    CommandBus, CommandError, CommandInterceptor, ExecutedCommand, LayoutEngine, MetricParams,
    Mutation, SelectionSource, SelectionTarget, UndoRedoPair,
};
pub use gridanchor_common::{
    GridRange, Position, ResourceKey, StructuralEdit, SubUnitId, UnitId,
};

mod config;
#[cfg(feature = "telemetry")]
pub mod telemetry;
pub mod workbench;

pub use config::WorkbenchConfig;
pub use workbench::{
    EditParams, GridDocument, STRUCTURAL_EDIT_COMMAND, Workbench, WorkbenchState,
};
