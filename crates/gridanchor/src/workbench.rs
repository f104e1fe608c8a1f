//! One document, one command bus, one resource cache.
//!
//! Structural edits travel as [`STRUCTURAL_EDIT_COMMAND`]. Its handler lets the
//! document apply the edit; a bus listener then rebases the cache's range
//! watches, so cached anchors follow rows and columns no matter who issued the
//! edit. Derived-metric mutations produced by the auto-fit synthesizer are
//! applied through the same bus.

use std::sync::Arc;

use gridanchor_cache::{
    ContentStore, EntryDescriptor, LoadedResource, ObserveOutcome, RepaintHook,
    ResourceCacheService,
};
use gridanchor_command::{
    AutoFitSynthesizer, AxisMetric, CommandBus, CommandError, CommandHandler, CommandInfo,
    CommandInterceptor,
    CommandListener, ExecutedCommand, InterceptorId, LayoutEngine, ListenerId, MetricParams,
    Mutation, SET_DERIVED_METRIC_MUTATION, SelectionSource, SelectionTarget, UndoRedoPair,
};
use gridanchor_common::{GridRange, ResourceKey, StructuralEdit, SubUnitId, UnitId};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::config::WorkbenchConfig;

pub const STRUCTURAL_EDIT_COMMAND: &str = "sheet.command.structural-edit";

/// Document side of the commands a [`Workbench`] registers itself.
pub trait GridDocument: LayoutEngine + SelectionSource {
    /// Apply `edit` to the document's own storage. `Ok(false)` declines, and a
    /// declined edit leaves cached anchors where they are.
    fn apply_edit(&mut self, unit: &UnitId, edit: &StructuralEdit) -> Result<bool, CommandError>;

    /// Store derived metric values (row heights after auto-fit, ...).
    fn apply_metrics(&mut self, params: &MetricParams) -> bool;
}

/// Params of [`STRUCTURAL_EDIT_COMMAND`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditParams {
    pub unit_id: UnitId,
    pub edit: StructuralEdit,
}

impl EditParams {
    pub fn from_value(params: &Value) -> Result<Self, CommandError> {
        serde_json::from_value(params.clone())
            .map_err(|e| CommandError::invalid_params(STRUCTURAL_EDIT_COMMAND, e))
    }
}

/// What command handlers and listeners registered on a workbench operate on.
pub struct WorkbenchState<D> {
    pub document: D,
    pub cache: ResourceCacheService,
}

impl<D: LayoutEngine> LayoutEngine for WorkbenchState<D> {
    fn derived_metric(
        &self,
        unit: &UnitId,
        sub_unit: &SubUnitId,
        ranges: &[GridRange],
    ) -> Vec<AxisMetric> {
        self.document.derived_metric(unit, sub_unit, ranges)
    }
}

impl<D: SelectionSource> SelectionSource for WorkbenchState<D> {
    fn current_selection(&self) -> Option<SelectionTarget> {
        self.document.current_selection()
    }
}

pub struct Workbench<D> {
    state: WorkbenchState<D>,
    bus: CommandBus<WorkbenchState<D>>,
    config: WorkbenchConfig,
}

impl<D: GridDocument + 'static> Workbench<D> {
    pub fn new(
        document: D,
        store: Arc<dyn ContentStore>,
        runtime: Handle,
        hook: Arc<dyn RepaintHook>,
        config: WorkbenchConfig,
    ) -> Result<Self, CommandError> {
        let cache = ResourceCacheService::new(store, runtime, hook, config.cache.clone());
        let mut bus = CommandBus::new();

        bus.register_command(
            STRUCTURAL_EDIT_COMMAND,
            Box::new(|state: &mut WorkbenchState<D>, params: &Value| {
                let EditParams { unit_id, edit } = EditParams::from_value(params)?;
                edit.validate()
                    .map_err(|e| CommandError::invalid_params(STRUCTURAL_EDIT_COMMAND, e))?;
                state.document.apply_edit(&unit_id, &edit)
            }),
        )?;
        bus.register_command(
            SET_DERIVED_METRIC_MUTATION,
            Box::new(|state: &mut WorkbenchState<D>, params: &Value| {
                let metrics = MetricParams::from_value(SET_DERIVED_METRIC_MUTATION, params)?;
                Ok(state.document.apply_metrics(&metrics))
            }),
        )?;
        bus.subscribe(Box::new(rebase_cache::<D>));
        if config.auto_fit {
            bus.register(Box::new(AutoFitSynthesizer::default()));
        }

        Ok(Self {
            state: WorkbenchState { document, cache },
            bus,
            config,
        })
    }

    pub fn config(&self) -> &WorkbenchConfig {
        &self.config
    }

    pub fn document(&self) -> &D {
        &self.state.document
    }

    pub fn document_mut(&mut self) -> &mut D {
        &mut self.state.document
    }

    pub fn cache(&self) -> &ResourceCacheService {
        &self.state.cache
    }

    pub fn cache_mut(&mut self) -> &mut ResourceCacheService {
        &mut self.state.cache
    }

    pub fn register_command(
        &mut self,
        id: impl Into<String>,
        handler: CommandHandler<WorkbenchState<D>>,
    ) -> Result<(), CommandError> {
        self.bus.register_command(id, handler)
    }

    pub fn register(
        &mut self,
        interceptor: Box<dyn CommandInterceptor<WorkbenchState<D>>>,
    ) -> InterceptorId {
        self.bus.register(interceptor)
    }

    pub fn register_interceptor<P, S>(&mut self, predicate: P, synthesize: S) -> InterceptorId
    where
        P: Fn(&str) -> bool + 'static,
        S: Fn(&WorkbenchState<D>, &CommandInfo) -> UndoRedoPair + 'static,
    {
        self.bus.register_interceptor(predicate, synthesize)
    }

    pub fn unregister_interceptor(&mut self, id: InterceptorId) -> bool {
        self.bus.unregister_interceptor(id)
    }

    pub fn subscribe(&mut self, listener: CommandListener<WorkbenchState<D>>) -> ListenerId {
        self.bus.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.bus.unsubscribe(id)
    }

    /// Execute `id` and, when it applied, its synthesized redo mutations.
    ///
    /// The command has already changed the document by the time the redo list
    /// runs, so a failing redo mutation is logged and the executed command is
    /// still returned with its undo list.
    pub fn execute(&mut self, id: &str, params: Value) -> Result<ExecutedCommand, CommandError> {
        let executed = self.bus.execute_command(&mut self.state, id, params)?;
        if executed.applied && !executed.undo_redo.redo.is_empty() {
            if let Err(err) = self
                .bus
                .apply_mutations(&mut self.state, &executed.undo_redo.redo)
            {
                warn!(id, error = %err, "redo mutations failed after command applied");
            }
        }
        Ok(executed)
    }

    pub fn apply_edit(
        &mut self,
        unit: &UnitId,
        edit: StructuralEdit,
    ) -> Result<ExecutedCommand, CommandError> {
        let params = serde_json::to_value(EditParams {
            unit_id: unit.clone(),
            edit,
        })
        .map_err(|e| CommandError::invalid_params(STRUCTURAL_EDIT_COMMAND, e))?;
        self.execute(STRUCTURAL_EDIT_COMMAND, params)
    }

    /// Replay one side of a synthesized pair.
    pub fn replay(&mut self, mutations: &[Mutation]) -> Result<usize, CommandError> {
        self.bus.apply_mutations(&mut self.state, mutations)
    }

    pub fn observe(
        &mut self,
        unit: &UnitId,
        sub_unit: &SubUnitId,
        key: ResourceKey,
        reference: impl Into<String>,
        row: u32,
        col: u32,
    ) -> ObserveOutcome {
        self.state
            .cache
            .observe(unit, sub_unit, key, reference, row, col)
    }

    pub fn clear_cell(&mut self, unit: &UnitId, sub_unit: &SubUnitId, row: u32, col: u32) -> usize {
        self.state.cache.clear_cell(unit, sub_unit, row, col)
    }

    pub fn get_by_position(
        &self,
        unit: &UnitId,
        sub_unit: &SubUnitId,
        row: u32,
        col: u32,
    ) -> FxHashMap<ResourceKey, EntryDescriptor> {
        self.state.cache.get_by_position(unit, sub_unit, row, col)
    }

    pub fn get_by_key(
        &self,
        unit: &UnitId,
        sub_unit: &SubUnitId,
        key: &ResourceKey,
    ) -> Option<LoadedResource> {
        self.state.cache.get_by_key(unit, sub_unit, key)
    }

    /// Apply loads that already finished, without waiting.
    pub fn pump(&mut self) -> usize {
        self.state.cache.apply_completions()
    }

    /// Wait for every in-flight load and apply it.
    pub async fn settle(&mut self) -> usize {
        self.state.cache.settle().await
    }

    /// Drop every cached entry and watch belonging to `unit`.
    pub fn close_unit(&mut self, unit: &UnitId) -> usize {
        self.state.cache.teardown_unit(unit)
    }
}

fn rebase_cache<D>(state: &mut WorkbenchState<D>, executed: &ExecutedCommand) {
    if !executed.applied || executed.id != STRUCTURAL_EDIT_COMMAND {
        return;
    }
    let EditParams { unit_id, edit } = match EditParams::from_value(&executed.params) {
        Ok(params) => params,
        Err(err) => {
            warn!(error = %err, "structural edit notification without edit params");
            return;
        }
    };
    match state.cache.on_structural_edit(&unit_id, &edit) {
        Ok(fired) => debug!(unit = %unit_id, fired, "cache anchors rebased"),
        Err(err) => warn!(unit = %unit_id, error = %err, "structural edit rejected by cache"),
    }
}
