//! Per-document resource caches wired to range watches and the async loader.
//!
//! [`ResourceCacheService`] owns one [`PositionIndexedCache`] per `(unit, sub_unit)`
//! scope. Every cached entry carries a 1x1 range watch as its disposer; when a
//! structural edit moves or removes the anchor cell, the watch callback queues a
//! relocation that is applied right after the registry finishes rebasing.

use std::sync::Arc;

use gridanchor_common::{
    EditError, GridRange, Position, ResourceKey, ScopeId, StructuralEdit, SubUnitId, UnitId,
};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::runtime::Handle;
use tracing::{debug, trace, warn};

use crate::config::CacheConfig;
use crate::index::{CacheEntry, LoadState, PositionIndexedCache};
use crate::loader::{ContentStore, LoadCompletion, LoadedResource, RepaintHook, ResourceLoader};
use crate::watch::{RangeWatchRegistry, WatchEvent};

pub type ScopeCache = PositionIndexedCache<LoadedResource>;

/// Read-only view of a cache entry handed to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDescriptor {
    pub key: ResourceKey,
    pub reference: String,
    pub position: Position,
    pub state: LoadState,
}

impl EntryDescriptor {
    fn of(entry: &CacheEntry<LoadedResource>) -> Self {
        Self {
            key: entry.key.clone(),
            reference: entry.reference.clone(),
            position: entry.position(),
            state: entry.load_state.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserveOutcome {
    /// New entry created and its load started.
    Created,
    /// Already cached at this position (loading, loaded or failed); nothing done.
    AlreadyCached,
    /// Key was cached elsewhere; the entry and its watch moved here.
    Relocated,
    /// Key now points at different content; the entry was reset and reloaded.
    Replaced,
    /// Row or column past [`MAX_GRID_INDEX`](gridanchor_common::MAX_GRID_INDEX); nothing cached.
    OutOfBounds,
}

struct Relocation {
    scope: ScopeId,
    key: ResourceKey,
    after: Option<GridRange>,
}

pub struct ResourceCacheService {
    scopes: FxHashMap<ScopeId, ScopeCache>,
    watches: RangeWatchRegistry,
    loader: ResourceLoader,
    repaint: Arc<dyn RepaintHook>,
    config: CacheConfig,
    relocations: Arc<Mutex<Vec<Relocation>>>,
}

impl ResourceCacheService {
    pub fn new(
        store: Arc<dyn ContentStore>,
        runtime: Handle,
        repaint: Arc<dyn RepaintHook>,
        config: CacheConfig,
    ) -> Self {
        Self {
            scopes: FxHashMap::default(),
            watches: RangeWatchRegistry::new(),
            loader: ResourceLoader::new(store, runtime, &config),
            repaint,
            config,
            relocations: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Record that the cell at `(row, col)` references `reference` under `key`.
    pub fn observe(
        &mut self,
        unit: &UnitId,
        sub_unit: &SubUnitId,
        key: ResourceKey,
        reference: impl Into<String>,
        row: u32,
        col: u32,
    ) -> ObserveOutcome {
        let scope = ScopeId::new(unit.clone(), sub_unit.clone());
        let Some(position) = Position::from_cell(row, col) else {
            warn!(%scope, %key, row, col, "anchor outside the grid; not cached");
            return ObserveOutcome::OutOfBounds;
        };
        let reference = reference.into();
        let cache = self.scopes.entry(scope.clone()).or_default();

        let same_content = match cache.get_by_key(&key) {
            Some(existing) if existing.reference != reference => Some(false),
            Some(existing) if existing.position() == position => {
                return ObserveOutcome::AlreadyCached;
            }
            Some(_) => Some(true),
            None => None,
        };

        let handle = {
            let queue = Arc::clone(&self.relocations);
            let scope = scope.clone();
            let key = key.clone();
            self.watches.watch(
                unit,
                sub_unit,
                GridRange::cell(row, col),
                Box::new(move |event: &WatchEvent| {
                    queue.lock().push(Relocation {
                        scope: scope.clone(),
                        key: key.clone(),
                        after: event.after,
                    });
                }),
            )
        };

        if same_content == Some(true) {
            // Keep state and payload; only the anchor and its watch change.
            if let Some(old) = cache.delete(&key) {
                let mut moved = CacheEntry::new(key.clone(), old.reference, position)
                    .with_disposer(Box::new(handle));
                moved.load_state = old.load_state;
                moved.resource = old.resource;
                cache.set(key.clone(), moved);
            }
            debug!(%scope, %key, %position, "cache entry relocated");
            return ObserveOutcome::Relocated;
        }

        // `set` releases a replaced entry together with its watch.
        let entry =
            CacheEntry::new(key.clone(), reference.clone(), position).with_disposer(Box::new(handle));
        cache.set(key.clone(), entry);
        let outcome = if same_content.is_some() {
            debug!(%scope, %key, %position, %reference, "cache entry replaced");
            ObserveOutcome::Replaced
        } else {
            debug!(%scope, %key, %position, "cache entry created");
            ObserveOutcome::Created
        };
        // A load still running for the old reference restarts on arrival.
        self.loader.begin(scope, key, reference);
        outcome
    }

    /// Rebase every watched anchor of `unit` through `edit`, moving or evicting
    /// the bound cache entries. Returns the number of watches that fired.
    pub fn on_structural_edit(
        &mut self,
        unit: &UnitId,
        edit: &StructuralEdit,
    ) -> Result<usize, EditError> {
        edit.validate()?;
        let fired = self.watches.apply_edit(unit, edit);
        self.flush_relocations();
        Ok(fired)
    }

    fn flush_relocations(&mut self) {
        let pending = std::mem::take(&mut *self.relocations.lock());
        for Relocation { scope, key, after } in pending {
            let Some(cache) = self.scopes.get_mut(&scope) else {
                trace!(%scope, %key, "watch fired for torn-down scope");
                continue;
            };
            match after.and_then(|range| range.origin()) {
                Some(origin) => cache.update(&key, origin.row, origin.col),
                None => {
                    cache.delete(&key);
                    debug!(%scope, %key, "anchor removed; cache entry evicted");
                }
            }
        }
    }

    /// Apply every load that already finished. Returns how many were applied.
    pub fn apply_completions(&mut self) -> usize {
        let mut applied = 0;
        while let Some(completion) = self.loader.try_next() {
            self.apply_completion(completion);
            applied += 1;
        }
        applied
    }

    /// Wait for the next load to finish and apply it. Returns `false` when no
    /// load is in flight.
    pub async fn next_completion(&mut self) -> bool {
        match self.loader.next().await {
            Some(completion) => {
                self.apply_completion(completion);
                true
            }
            None => false,
        }
    }

    /// Drive every in-flight load to completion.
    pub async fn settle(&mut self) -> usize {
        let mut applied = 0;
        while self.next_completion().await {
            applied += 1;
        }
        applied
    }

    fn apply_completion(&mut self, completion: LoadCompletion) {
        let LoadCompletion {
            scope,
            key,
            reference,
            result,
        } = completion;
        let Some(cache) = self.scopes.get_mut(&scope) else {
            trace!(%scope, %key, "load finished for torn-down scope");
            return;
        };
        let current = match cache.get_by_key(&key) {
            Some(entry) => entry.reference.clone(),
            None => {
                trace!(%scope, %key, "load finished for deleted entry");
                return;
            }
        };
        if current != reference {
            trace!(%scope, %key, stale = %reference, "load finished for replaced reference");
            self.loader.begin(scope, key, current);
            return;
        }
        let failed = result.is_err();
        if let Err(err) = &result {
            warn!(%scope, %key, error = %err, "resource load failed");
        }
        cache.complete_load(&key, result);
        if failed && !self.config.repaint_on_failure {
            return;
        }
        if self.repaint.active_unit().as_ref() == Some(&scope.unit) {
            self.repaint.request_repaint(&scope.unit, &scope.sub_unit);
        }
    }

    /// Explicitly re-fetch a failed entry. Returns `false` if the entry is
    /// missing or not in the failed state.
    pub fn retry_failed(&mut self, unit: &UnitId, sub_unit: &SubUnitId, key: &ResourceKey) -> bool {
        let scope = ScopeId::new(unit.clone(), sub_unit.clone());
        let Some(reference) = self
            .scopes
            .get_mut(&scope)
            .and_then(|cache| cache.mark_reloading(key))
        else {
            return false;
        };
        self.loader.begin(scope, key.clone(), reference)
    }

    pub fn get_by_position(
        &self,
        unit: &UnitId,
        sub_unit: &SubUnitId,
        row: u32,
        col: u32,
    ) -> FxHashMap<ResourceKey, EntryDescriptor> {
        let (Some(cache), Some(at)) = (self.scope(unit, sub_unit), Position::from_cell(row, col))
        else {
            return FxHashMap::default();
        };
        cache
            .get_by_position(at.row, at.col)
            .into_iter()
            .map(|entry| (entry.key.clone(), EntryDescriptor::of(entry)))
            .collect()
    }

    /// Loaded resource for `key`; `None` while loading, after failure, or if unknown.
    pub fn get_by_key(
        &self,
        unit: &UnitId,
        sub_unit: &SubUnitId,
        key: &ResourceKey,
    ) -> Option<LoadedResource> {
        self.scope(unit, sub_unit)?.get_by_key(key)?.resource.clone()
    }

    pub fn describe(
        &self,
        unit: &UnitId,
        sub_unit: &SubUnitId,
        key: &ResourceKey,
    ) -> Option<EntryDescriptor> {
        self.scope(unit, sub_unit)?
            .get_by_key(key)
            .map(EntryDescriptor::of)
    }

    /// The cell at `(row, col)` no longer references any resource.
    pub fn clear_cell(&mut self, unit: &UnitId, sub_unit: &SubUnitId, row: u32, col: u32) -> usize {
        let scope = ScopeId::new(unit.clone(), sub_unit.clone());
        let (Some(cache), Some(at)) = (self.scopes.get_mut(&scope), Position::from_cell(row, col))
        else {
            return 0;
        };
        cache.delete_by_position(at.row, at.col).len()
    }

    pub fn remove(&mut self, unit: &UnitId, sub_unit: &SubUnitId, key: &ResourceKey) -> bool {
        let scope = ScopeId::new(unit.clone(), sub_unit.clone());
        self.scopes
            .get_mut(&scope)
            .and_then(|cache| cache.delete(key))
            .is_some()
    }

    /// Tear down every scope of `unit`: watch handles are disposed first, then
    /// the indices are cleared. Loads still in flight are dropped on arrival.
    pub fn teardown_unit(&mut self, unit: &UnitId) -> usize {
        let scopes: Vec<ScopeId> = self
            .scopes
            .keys()
            .filter(|s| s.unit == *unit)
            .cloned()
            .collect();
        let mut evicted = 0;
        for scope in scopes {
            if let Some(mut cache) = self.scopes.remove(&scope) {
                evicted += cache.drain();
            }
        }
        self.watches.teardown_unit(unit);
        self.relocations.lock().retain(|r| r.scope.unit != *unit);
        debug!(%unit, evicted, "unit torn down");
        evicted
    }

    pub fn scope(&self, unit: &UnitId, sub_unit: &SubUnitId) -> Option<&ScopeCache> {
        self.scopes
            .get(&ScopeId::new(unit.clone(), sub_unit.clone()))
    }

    pub fn loads_in_flight(&self) -> usize {
        self.loader.in_flight()
    }

    pub fn watch_count(&self) -> usize {
        self.watches.len()
    }
}
