//! Common test helpers
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use gridanchor_common::{SubUnitId, UnitId};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;

use crate::{CacheConfig, ContentStore, LoadError, RepaintHook, ResourceCacheService};

pub fn book() -> UnitId {
    UnitId::from("book")
}

pub fn sheet() -> SubUnitId {
    SubUnitId::from("sheet1")
}

/// In-memory store; fetches optionally wait on a gate until the test opens it.
pub struct MemoryStore {
    blobs: HashMap<String, Vec<u8>>,
    gate: Option<Semaphore>,
    pub calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new(blobs: &[(&str, &[u8])]) -> Arc<Self> {
        Arc::new(Self::build(blobs, None))
    }

    pub fn gated(blobs: &[(&str, &[u8])]) -> Arc<Self> {
        Arc::new(Self::build(blobs, Some(Semaphore::new(0))))
    }

    fn build(blobs: &[(&str, &[u8])], gate: Option<Semaphore>) -> Self {
        Self {
            blobs: blobs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_vec()))
                .collect(),
            gate,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn open(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn fetch(&self, reference: &str) -> Result<Vec<u8>, LoadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|e| LoadError::Transport(e.to_string()))?
                .forget();
        }
        self.blobs
            .get(reference)
            .cloned()
            .ok_or_else(|| LoadError::NotFound(reference.to_string()))
    }
}

/// Records repaint requests; reports `active` as the surface's unit.
#[derive(Default)]
pub struct RecordingRepaint {
    pub active: Mutex<Option<UnitId>>,
    pub requests: Mutex<Vec<(UnitId, SubUnitId)>>,
}

impl RecordingRepaint {
    pub fn showing(unit: UnitId) -> Arc<Self> {
        Arc::new(Self {
            active: Mutex::new(Some(unit)),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn count(&self) -> usize {
        self.requests.lock().len()
    }
}

impl RepaintHook for RecordingRepaint {
    fn active_unit(&self) -> Option<UnitId> {
        self.active.lock().clone()
    }

    fn request_repaint(&self, unit: &UnitId, sub_unit: &SubUnitId) {
        self.requests.lock().push((unit.clone(), sub_unit.clone()));
    }
}

pub fn service(store: Arc<MemoryStore>, repaint: Arc<RecordingRepaint>) -> ResourceCacheService {
    ResourceCacheService::new(store, Handle::current(), repaint, CacheConfig::default())
}
