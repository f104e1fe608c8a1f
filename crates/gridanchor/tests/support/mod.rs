#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use gridanchor::command::{AxisMetric, CommandHandler, SET_STYLE_COMMAND};
use gridanchor::{
    CommandError, ContentStore, GridDocument, GridRange, LayoutEngine, LoadError, MetricParams,
    RepaintHook, SelectionSource, SelectionTarget, StructuralEdit, SubUnitId, UnitId, Workbench,
    WorkbenchConfig, WorkbenchState,
};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::runtime::Handle;

pub const DEFAULT_FONT: f64 = 11.0;

pub fn book() -> UnitId {
    UnitId::from("book")
}

pub fn sheet() -> SubUnitId {
    SubUnitId::from("sheet1")
}

/// Minimal grid document: per-cell font sizes drive row heights.
pub struct TestDoc {
    pub fonts: BTreeMap<(u32, u32), f64>,
    pub heights: BTreeMap<u32, f64>,
    pub selection: Option<Vec<GridRange>>,
    /// Decline every structural edit.
    pub frozen: bool,
    pub edits: Vec<StructuralEdit>,
}

impl TestDoc {
    pub fn new() -> Self {
        let mut doc = TestDoc {
            fonts: BTreeMap::new(),
            heights: BTreeMap::new(),
            selection: None,
            frozen: false,
            edits: Vec::new(),
        };
        for row in 0..8 {
            doc.heights.insert(row, doc.row_height(row));
        }
        doc
    }

    pub fn row_height(&self, row: u32) -> f64 {
        self.fonts
            .iter()
            .filter(|((r, _), _)| *r == row)
            .map(|(_, size)| *size)
            .fold(DEFAULT_FONT, f64::max)
            * 1.5
    }
}

impl LayoutEngine for TestDoc {
    fn derived_metric(
        &self,
        _unit: &UnitId,
        _sub_unit: &SubUnitId,
        ranges: &[GridRange],
    ) -> Vec<AxisMetric> {
        ranges
            .iter()
            .flat_map(|r| r.row_indices())
            .map(|row| AxisMetric {
                index: row,
                value: self.row_height(row),
            })
            .collect()
    }
}

impl SelectionSource for TestDoc {
    fn current_selection(&self) -> Option<SelectionTarget> {
        self.selection.clone().map(|ranges| SelectionTarget {
            unit: book(),
            sub_unit: sheet(),
            ranges,
        })
    }
}

impl GridDocument for TestDoc {
    fn apply_edit(&mut self, _unit: &UnitId, edit: &StructuralEdit) -> Result<bool, CommandError> {
        if self.frozen {
            return Ok(false);
        }
        self.edits.push(edit.clone());
        Ok(true)
    }

    fn apply_metrics(&mut self, params: &MetricParams) -> bool {
        for metric in &params.metrics {
            self.heights.insert(metric.index, metric.value);
        }
        true
    }
}

/// `{ "fontSize": f64, "ranges"?: [...] }`; falls back to the selection.
pub fn style_handler() -> CommandHandler<WorkbenchState<TestDoc>> {
    Box::new(|state: &mut WorkbenchState<TestDoc>, params: &Value| {
        let size = params["fontSize"]
            .as_f64()
            .ok_or_else(|| CommandError::invalid_params(SET_STYLE_COMMAND, "fontSize"))?;
        let ranges: Vec<GridRange> = match params.get("ranges") {
            Some(r) => serde_json::from_value(r.clone())
                .map_err(|e| CommandError::invalid_params(SET_STYLE_COMMAND, e))?,
            None => state.document.selection.clone().unwrap_or_default(),
        };
        if ranges.is_empty() {
            return Ok(false);
        }
        for range in &ranges {
            for row in range.start_row..=range.end_row {
                for col in range.start_col..=range.end_col {
                    state.document.fonts.insert((row, col), size);
                }
            }
        }
        Ok(true)
    })
}

pub struct MemoryStore {
    blobs: HashMap<String, Vec<u8>>,
    calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new(blobs: &[(&str, &[u8])]) -> Arc<Self> {
        Arc::new(Self {
            blobs: blobs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_vec()))
                .collect(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn fetch(&self, reference: &str) -> Result<Vec<u8>, LoadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.blobs
            .get(reference)
            .cloned()
            .ok_or_else(|| LoadError::NotFound(reference.to_string()))
    }
}

#[derive(Default)]
pub struct RecordingRepaint {
    pub requests: Mutex<Vec<(UnitId, SubUnitId)>>,
}

impl RecordingRepaint {
    pub fn count(&self) -> usize {
        self.requests.lock().len()
    }
}

impl RepaintHook for RecordingRepaint {
    fn active_unit(&self) -> Option<UnitId> {
        Some(book())
    }

    fn request_repaint(&self, unit: &UnitId, sub_unit: &SubUnitId) {
        self.requests.lock().push((unit.clone(), sub_unit.clone()));
    }
}

pub fn workbench(doc: TestDoc, store: Arc<MemoryStore>, repaint: Arc<RecordingRepaint>) -> Workbench<TestDoc> {
    let mut wb = Workbench::new(doc, store, Handle::current(), repaint, WorkbenchConfig::default())
        .unwrap();
    wb.register_command(SET_STYLE_COMMAND, style_handler())
        .unwrap();
    wb
}
