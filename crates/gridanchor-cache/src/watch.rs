//! Range watches: callbacks bound to a rectangle that follow it through
//! structural edits.
//!
//! The watch table lives behind a shared mutex so handles can be disposed from
//! whoever owns them (usually a cache entry). Handles only hold a weak
//! reference, which turns disposal after registry teardown into a silent no-op.

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use gridanchor_common::{Disposable, GridRange, ScopeId, StructuralEdit, SubUnitId, UnitId};
use parking_lot::Mutex;
use tracing::{debug, trace};

/// Delivered to a watch callback when its rectangle changed.
/// `after == None` means the rectangle no longer exists; the watch is gone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub unit: UnitId,
    pub sub_unit: SubUnitId,
    pub before: GridRange,
    pub after: Option<GridRange>,
}

pub type WatchCallback = Box<dyn FnMut(&WatchEvent) + Send>;

struct RangeWatch {
    scope: ScopeId,
    range: GridRange,
    // `None` while the callback is running outside the lock.
    callback: Option<WatchCallback>,
}

#[derive(Default)]
struct WatchTable {
    next_id: u64,
    watches: BTreeMap<u64, RangeWatch>,
}

#[derive(Default)]
pub struct RangeWatchRegistry {
    table: Arc<Mutex<WatchTable>>,
}

impl RangeWatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn watch(
        &self,
        unit: &UnitId,
        sub_unit: &SubUnitId,
        range: GridRange,
        callback: WatchCallback,
    ) -> WatchHandle {
        let mut table = self.table.lock();
        let id = table.next_id;
        table.next_id += 1;
        table.watches.insert(
            id,
            RangeWatch {
                scope: ScopeId::new(unit.clone(), sub_unit.clone()),
                range,
                callback: Some(callback),
            },
        );
        trace!(id, %unit, %sub_unit, ?range, "range watch registered");
        WatchHandle {
            id,
            table: Arc::downgrade(&self.table),
        }
    }

    /// Rebase every watch on the edited sub-unit and fire the ones whose
    /// rectangle changed, in registration order. Collapsed watches are removed
    /// before their callback runs. Returns the number of callbacks fired.
    pub fn apply_edit(&self, unit: &UnitId, edit: &StructuralEdit) -> usize {
        let _span = tracing::debug_span!("range_watch_apply_edit", %unit, sub_unit = %edit.sub_unit())
            .entered();
        let mut fired = Vec::new();
        {
            let mut table = self.table.lock();
            let mut collapsed = Vec::new();
            for (&id, watch) in table.watches.iter_mut() {
                if watch.scope.unit != *unit || watch.scope.sub_unit != *edit.sub_unit() {
                    continue;
                }
                let before = watch.range;
                let after = edit.adjust_range(&before);
                if after == Some(before) {
                    continue;
                }
                match after {
                    Some(range) => watch.range = range,
                    None => collapsed.push(id),
                }
                let event = WatchEvent {
                    unit: unit.clone(),
                    sub_unit: edit.sub_unit().clone(),
                    before,
                    after,
                };
                fired.push((id, event, watch.callback.take()));
            }
            for id in collapsed {
                table.watches.remove(&id);
            }
        }

        for (_, event, callback) in fired.iter_mut() {
            if let Some(cb) = callback.as_mut() {
                cb(&*event);
            }
        }

        let count = fired.len();
        let mut table = self.table.lock();
        for (id, event, callback) in fired {
            if event.after.is_none() {
                continue;
            }
            // The callback may have disposed its own watch.
            if let Some(watch) = table.watches.get_mut(&id) {
                watch.callback = callback;
            }
        }
        debug!(fired = count, remaining = table.watches.len(), "range watches rebased");
        count
    }

    /// Drop every watch of a unit without firing anything.
    pub fn teardown_unit(&self, unit: &UnitId) -> usize {
        let dropped: Vec<RangeWatch> = {
            let mut table = self.table.lock();
            let ids: Vec<u64> = table
                .watches
                .iter()
                .filter(|(_, w)| w.scope.unit == *unit)
                .map(|(id, _)| *id)
                .collect();
            ids.iter()
                .filter_map(|id| table.watches.remove(id))
                .collect()
        };
        debug!(%unit, dropped = dropped.len(), "range watches torn down");
        dropped.len()
    }

    /// Current rectangle of a live watch.
    pub fn range_of(&self, handle: &WatchHandle) -> Option<GridRange> {
        self.table.lock().watches.get(&handle.id).map(|w| w.range)
    }

    pub fn len(&self) -> usize {
        self.table.lock().watches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Subscription token returned by [`RangeWatchRegistry::watch`].
#[derive(Debug)]
pub struct WatchHandle {
    id: u64,
    table: Weak<Mutex<WatchTable>>,
}

impl WatchHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.table
            .upgrade()
            .is_some_and(|t| t.lock().watches.contains_key(&self.id))
    }
}

impl Disposable for WatchHandle {
    fn dispose(&mut self) {
        let Some(table) = self.table.upgrade() else {
            return;
        };
        // Take the callback out before dropping it so its destructor runs unlocked.
        let removed = table.lock().watches.remove(&self.id);
        if removed.is_some() {
            trace!(id = self.id, "range watch disposed");
        }
        drop(removed);
        self.table = Weak::new();
    }
}
