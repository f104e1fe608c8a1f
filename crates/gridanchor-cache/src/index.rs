//! Dual-indexed store of grid-anchored resources.
//!
//! Entries are addressed by [`ResourceKey`] and, while attached, by the
//! [`Position`] of their anchor cell. The position index is purely derived from
//! the entries: every mutation goes through [`PositionIndexedCache::update`], and
//! buckets that become empty are removed on the spot.

use gridanchor_common::{Disposable, Position, ResourceKey};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::error::LoadError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    Loaded,
    Failed(LoadError),
}

impl LoadState {
    pub fn is_failed(&self) -> bool {
        matches!(self, LoadState::Failed(_))
    }
}

pub struct CacheEntry<R> {
    pub key: ResourceKey,
    /// Reference the backing content is fetched from.
    pub reference: String,
    position: Position,
    disposer: Option<Box<dyn Disposable>>,
    pub load_state: LoadState,
    pub resource: Option<R>,
}

impl<R> CacheEntry<R> {
    pub fn new(key: ResourceKey, reference: impl Into<String>, position: Position) -> Self {
        Self {
            key,
            reference: reference.into(),
            position,
            disposer: None,
            load_state: LoadState::Loading,
            resource: None,
        }
    }

    pub fn with_disposer(mut self, disposer: Box<dyn Disposable>) -> Self {
        self.disposer = Some(disposer);
        self
    }

    pub fn position(&self) -> Position {
        self.position
    }

    fn release(&mut self) {
        if let Some(mut disposer) = self.disposer.take() {
            disposer.dispose();
        }
    }
}

impl<R: std::fmt::Debug> std::fmt::Debug for CacheEntry<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEntry")
            .field("key", &self.key)
            .field("reference", &self.reference)
            .field("position", &self.position)
            .field("has_disposer", &self.disposer.is_some())
            .field("load_state", &self.load_state)
            .field("resource", &self.resource)
            .finish()
    }
}

type Bucket = SmallVec<[ResourceKey; 1]>;

pub struct PositionIndexedCache<R> {
    entries: FxHashMap<ResourceKey, CacheEntry<R>>,
    by_position: FxHashMap<Position, Bucket>,
}

impl<R> Default for PositionIndexedCache<R> {
    fn default() -> Self {
        Self {
            entries: FxHashMap::default(),
            by_position: FxHashMap::default(),
        }
    }
}

impl<R> PositionIndexedCache<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for `key`. A replaced entry is unindexed and
    /// its disposer released.
    pub fn set(&mut self, key: ResourceKey, mut entry: CacheEntry<R>) {
        let target = entry.position;
        entry.key = key.clone();
        entry.position = Position::DETACHED;
        if let Some(mut old) = self.entries.insert(key.clone(), entry) {
            unindex(&mut self.by_position, &key, old.position);
            old.release();
        }
        self.update(&key, target.row, target.col);
    }

    /// Move an entry to `(row, col)`. A negative component detaches it from the
    /// position index while keeping it addressable by key. Unknown keys are ignored.
    pub fn update(&mut self, key: &ResourceKey, row: i32, col: i32) {
        let Some(entry) = self.entries.get_mut(key) else {
            return;
        };
        let next = Position::normalized(row, col);
        let prev = std::mem::replace(&mut entry.position, next);
        if prev == next {
            return;
        }
        unindex(&mut self.by_position, key, prev);
        if !next.is_detached() {
            let bucket = self.by_position.entry(next).or_default();
            if !bucket.contains(key) {
                bucket.push(key.clone());
            }
        }
    }

    /// Remove an entry, releasing its disposer. Absent keys are a no-op.
    pub fn delete(&mut self, key: &ResourceKey) -> Option<CacheEntry<R>> {
        self.update(key, -1, -1);
        let mut entry = self.entries.remove(key)?;
        entry.release();
        Some(entry)
    }

    /// Evict every entry anchored at `(row, col)`.
    pub fn delete_by_position(&mut self, row: i32, col: i32) -> Vec<CacheEntry<R>> {
        let pos = Position::normalized(row, col);
        if pos.is_detached() {
            return Vec::new();
        }
        let keys = self.by_position.get(&pos).cloned().unwrap_or_default();
        keys.iter().filter_map(|key| self.delete(key)).collect()
    }

    pub fn get_by_position(&self, row: i32, col: i32) -> Vec<&CacheEntry<R>> {
        let pos = Position::normalized(row, col);
        if pos.is_detached() {
            return Vec::new();
        }
        self.by_position
            .get(&pos)
            .map(|keys| keys.iter().filter_map(|k| self.entries.get(k)).collect())
            .unwrap_or_default()
    }

    pub fn get_by_key(&self, key: &ResourceKey) -> Option<&CacheEntry<R>> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &ResourceKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Record the outcome of a backing load. Returns `false` when the entry no
    /// longer exists.
    pub fn complete_load(&mut self, key: &ResourceKey, outcome: Result<R, LoadError>) -> bool {
        let Some(entry) = self.entries.get_mut(key) else {
            return false;
        };
        match outcome {
            Ok(resource) => {
                entry.resource = Some(resource);
                entry.load_state = LoadState::Loaded;
            }
            Err(err) => {
                entry.resource = None;
                entry.load_state = LoadState::Failed(err);
            }
        }
        true
    }

    /// Put a failed entry back into `Loading`. Returns its reference on success.
    pub fn mark_reloading(&mut self, key: &ResourceKey) -> Option<String> {
        let entry = self.entries.get_mut(key)?;
        if !entry.load_state.is_failed() {
            return None;
        }
        entry.load_state = LoadState::Loading;
        Some(entry.reference.clone())
    }

    pub fn keys(&self) -> impl Iterator<Item = &ResourceKey> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of non-empty position buckets.
    pub fn bucket_count(&self) -> usize {
        self.by_position.len()
    }

    /// Release every disposer, then clear both indices.
    pub fn drain(&mut self) -> usize {
        for entry in self.entries.values_mut() {
            entry.release();
        }
        let n = self.entries.len();
        self.by_position.clear();
        self.entries.clear();
        n
    }

    #[cfg(test)]
    fn assert_coherent(&self) {
        let mut seen = rustc_hash::FxHashSet::default();
        for (pos, bucket) in &self.by_position {
            assert!(!bucket.is_empty(), "empty bucket left at {pos}");
            for key in bucket {
                assert!(seen.insert(key.clone()), "{key} indexed twice");
                let entry = self.entries.get(key).expect("orphan key in index");
                assert_eq!(entry.position, *pos);
            }
        }
        for (key, entry) in &self.entries {
            assert_eq!(entry.position.is_detached(), !seen.contains(key));
        }
    }
}

fn unindex(by_position: &mut FxHashMap<Position, Bucket>, key: &ResourceKey, pos: Position) {
    if pos.is_detached() {
        return;
    }
    if let Some(bucket) = by_position.get_mut(&pos) {
        bucket.retain(|k| k != key);
        if bucket.is_empty() {
            by_position.remove(&pos);
        }
    }
}
