//! Asynchronous backing loads for cache entries.
//!
//! Each load runs as an independent tokio task. Completions travel back over an
//! unbounded channel and are applied by whoever owns the cache, on its own
//! thread, so cache state is never touched from a task.

use std::sync::Arc;

use async_trait::async_trait;
use gridanchor_common::{ResourceKey, ScopeId, SubUnitId, UnitId};
use rustc_hash::FxHashSet;
use tokio::runtime::Handle;
use tokio::sync::{Semaphore, mpsc};
use tracing::trace;

use crate::config::CacheConfig;
use crate::error::LoadError;

/// Byte store behind resource references (image service, blob store, ...).
#[async_trait]
pub trait ContentStore: Send + Sync + 'static {
    async fn fetch(&self, reference: &str) -> Result<Vec<u8>, LoadError>;
}

/// Invalidation hook of a render surface.
pub trait RepaintHook: Send + Sync {
    /// Unit currently shown by the surface, if any.
    fn active_unit(&self) -> Option<UnitId>;
    fn request_repaint(&self, unit: &UnitId, sub_unit: &SubUnitId);
}

/// Repaint hook for headless use.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRepaint;

impl RepaintHook for NoRepaint {
    fn active_unit(&self) -> Option<UnitId> {
        None
    }

    fn request_repaint(&self, _unit: &UnitId, _sub_unit: &SubUnitId) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedResource {
    pub reference: String,
    pub bytes: Arc<[u8]>,
}

#[derive(Debug)]
pub struct LoadCompletion {
    pub scope: ScopeId,
    pub key: ResourceKey,
    /// Reference the load was started for.
    pub reference: String,
    pub result: Result<LoadedResource, LoadError>,
}

pub struct ResourceLoader {
    store: Arc<dyn ContentStore>,
    runtime: Handle,
    permits: Option<Arc<Semaphore>>,
    in_flight: FxHashSet<(ScopeId, ResourceKey)>,
    tx: mpsc::UnboundedSender<LoadCompletion>,
    rx: mpsc::UnboundedReceiver<LoadCompletion>,
}

impl ResourceLoader {
    pub fn new(store: Arc<dyn ContentStore>, runtime: Handle, config: &CacheConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            store,
            runtime,
            permits: config
                .max_concurrent_loads
                .map(|n| Arc::new(Semaphore::new(n))),
            in_flight: FxHashSet::default(),
            tx,
            rx,
        }
    }

    /// Start loading `reference` for `key`. Returns `false` without spawning
    /// anything if a load for the key is already in flight.
    pub fn begin(&mut self, scope: ScopeId, key: ResourceKey, reference: String) -> bool {
        if !self.in_flight.insert((scope.clone(), key.clone())) {
            trace!(%scope, %key, "load already in flight");
            return false;
        }
        let store = Arc::clone(&self.store);
        let permits = self.permits.clone();
        let tx = self.tx.clone();
        trace!(%scope, %key, %reference, "load started");
        self.runtime.spawn(async move {
            let _permit = match permits {
                Some(sem) => sem.acquire_owned().await.ok(),
                None => None,
            };
            let fetch_ref = reference.clone();
            // Run the fetch in its own task so a panicking store still reports back.
            let joined = tokio::spawn(async move { store.fetch(&fetch_ref).await }).await;
            let result = match joined {
                Ok(Ok(bytes)) => Ok(LoadedResource {
                    reference: reference.clone(),
                    bytes: bytes.into(),
                }),
                Ok(Err(err)) => Err(err),
                Err(join_err) => Err(LoadError::Aborted(join_err.to_string())),
            };
            // A closed channel means the owning service is gone.
            let _ = tx.send(LoadCompletion {
                scope,
                key,
                reference,
                result,
            });
        });
        true
    }

    pub fn is_loading(&self, scope: &ScopeId, key: &ResourceKey) -> bool {
        self.in_flight.contains(&(scope.clone(), key.clone()))
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Next finished load, without waiting.
    pub fn try_next(&mut self) -> Option<LoadCompletion> {
        let completion = self.rx.try_recv().ok()?;
        Some(self.settle(completion))
    }

    /// Wait for the next finished load. Returns `None` when nothing is in flight.
    pub async fn next(&mut self) -> Option<LoadCompletion> {
        if self.in_flight.is_empty() {
            return None;
        }
        let completion = self.rx.recv().await?;
        Some(self.settle(completion))
    }

    fn settle(&mut self, completion: LoadCompletion) -> LoadCompletion {
        self.in_flight
            .remove(&(completion.scope.clone(), completion.key.clone()));
        completion
    }
}
