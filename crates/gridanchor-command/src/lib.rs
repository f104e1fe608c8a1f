//! Command bus, interceptors and undo/redo pair synthesis.
//!
//! Handlers mutate a caller-owned document `D`. Interceptors registered on the
//! bus observe every command, snapshot what they need before the handler runs,
//! and contribute compensating `(undo, redo)` mutation lists afterwards.

pub mod bus;
mod error;
pub mod interceptor;
pub mod mutation;
pub mod synthesizer;

pub use bus::{CommandBus, CommandHandler, CommandListener, ExecutedCommand, ListenerId};
pub use error::CommandError;
pub use interceptor::{Captured, CommandInterceptor, FnInterceptor, InterceptorId, InterceptorRegistry};
pub use mutation::{CommandInfo, Mutation, UndoRedoPair};
pub use synthesizer::{
    AUTO_FIT_ROW_HEIGHT_COMMAND, AutoFitSynthesizer, AxisMetric, LayoutEngine, MetricParams,
    SET_DERIVED_METRIC_MUTATION, SET_STYLE_COMMAND, SelectionSource, SelectionTarget,
};
