//! Undo/redo synthesis for commands that change a derived layout metric
//! (auto-fit row heights and similar).
//!
//! The affected ranges come from the command's own `ranges` parameter or, for
//! style commands, from the current selection. Previous metric values are read
//! in the capture phase, before the command runs; the new values are read after.
//! Both mutations carry the full metric list so either one can be replayed on
//! its own.

use gridanchor_common::{GridRange, SubUnitId, UnitId};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

use crate::error::CommandError;
use crate::interceptor::CommandInterceptor;
use crate::mutation::{CommandInfo, Mutation, UndoRedoPair};

pub const SET_STYLE_COMMAND: &str = "sheet.command.set-style";
pub const AUTO_FIT_ROW_HEIGHT_COMMAND: &str = "sheet.command.auto-fit-row-height";
pub const SET_DERIVED_METRIC_MUTATION: &str = "sheet.mutation.set-derived-metric";

/// One derived value on a row or column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisMetric {
    pub index: u32,
    pub value: f64,
}

/// Read-only query into the layout engine.
pub trait LayoutEngine {
    fn derived_metric(
        &self,
        unit: &UnitId,
        sub_unit: &SubUnitId,
        ranges: &[GridRange],
    ) -> Vec<AxisMetric>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectionTarget {
    pub unit: UnitId,
    pub sub_unit: SubUnitId,
    pub ranges: Vec<GridRange>,
}

pub trait SelectionSource {
    fn current_selection(&self) -> Option<SelectionTarget>;
}

/// Payload of [`SET_DERIVED_METRIC_MUTATION`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricParams {
    pub unit_id: UnitId,
    pub sub_unit_id: SubUnitId,
    pub ranges: Vec<GridRange>,
    pub metrics: Vec<AxisMetric>,
}

impl MetricParams {
    pub fn from_value(id: &str, params: &Value) -> Result<Self, CommandError> {
        serde_json::from_value(params.clone()).map_err(|e| CommandError::invalid_params(id, e))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TargetParams {
    unit_id: Option<UnitId>,
    sub_unit_id: Option<SubUnitId>,
    #[serde(default)]
    ranges: Vec<GridRange>,
}

pub struct AutoFitSynthesizer {
    style_commands: FxHashSet<String>,
    recompute_commands: FxHashSet<String>,
    mutation_id: String,
}

impl Default for AutoFitSynthesizer {
    fn default() -> Self {
        Self::new(SET_DERIVED_METRIC_MUTATION)
            .with_style_command(SET_STYLE_COMMAND)
            .with_recompute_command(AUTO_FIT_ROW_HEIGHT_COMMAND)
    }
}

impl AutoFitSynthesizer {
    pub fn new(mutation_id: impl Into<String>) -> Self {
        Self {
            style_commands: FxHashSet::default(),
            recompute_commands: FxHashSet::default(),
            mutation_id: mutation_id.into(),
        }
    }

    /// Command whose ranges fall back to the current selection.
    pub fn with_style_command(mut self, id: impl Into<String>) -> Self {
        self.style_commands.insert(id.into());
        self
    }

    /// Command that must declare its own ranges.
    pub fn with_recompute_command(mut self, id: impl Into<String>) -> Self {
        self.recompute_commands.insert(id.into());
        self
    }

    fn resolve<D: SelectionSource>(&self, doc: &D, command: &CommandInfo) -> Option<SelectionTarget> {
        let declared: TargetParams = serde_json::from_value(command.params.clone()).unwrap_or_default();
        let selection = || doc.current_selection();
        let target = if !declared.ranges.is_empty() {
            let (unit, sub_unit) = match (declared.unit_id, declared.sub_unit_id) {
                (Some(u), Some(s)) => (u, s),
                _ => {
                    let sel = selection()?;
                    (sel.unit, sel.sub_unit)
                }
            };
            SelectionTarget {
                unit,
                sub_unit,
                ranges: declared.ranges,
            }
        } else if self.style_commands.contains(&command.id) {
            selection()?
        } else {
            return None;
        };
        (!target.ranges.is_empty()).then_some(target)
    }
}

impl<D> CommandInterceptor<D> for AutoFitSynthesizer
where
    D: LayoutEngine + SelectionSource,
{
    fn matches(&self, command_id: &str) -> bool {
        self.style_commands.contains(command_id) || self.recompute_commands.contains(command_id)
    }

    fn capture(&self, doc: &D, command: &CommandInfo) -> Value {
        let Some(target) = self.resolve(doc, command) else {
            trace!(id = %command.id, "no ranges resolved; nothing to capture");
            return Value::Null;
        };
        let metrics = doc.derived_metric(&target.unit, &target.sub_unit, &target.ranges);
        let previous = MetricParams {
            unit_id: target.unit,
            sub_unit_id: target.sub_unit,
            ranges: target.ranges,
            metrics,
        };
        serde_json::to_value(previous).unwrap_or(Value::Null)
    }

    fn synthesize(&self, doc: &D, command: &CommandInfo, snapshot: &Value) -> UndoRedoPair {
        if snapshot.is_null() {
            return UndoRedoPair::default();
        }
        let Ok(previous) = MetricParams::from_value(&command.id, snapshot) else {
            return UndoRedoPair::default();
        };
        let current = MetricParams {
            metrics: doc.derived_metric(&previous.unit_id, &previous.sub_unit_id, &previous.ranges),
            ..previous.clone()
        };
        let (Ok(undo), Ok(redo)) = (serde_json::to_value(&previous), serde_json::to_value(&current))
        else {
            return UndoRedoPair::default();
        };
        UndoRedoPair::new(
            vec![Mutation::new(self.mutation_id.clone(), undo)],
            vec![Mutation::new(self.mutation_id.clone(), redo)],
        )
    }
}
