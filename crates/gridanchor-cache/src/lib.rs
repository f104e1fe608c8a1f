//! Position-indexed resource cache.
//!
//! Resources (images, embedded objects, ...) anchored to grid cells are cached
//! per `(unit, sub_unit)` scope, indexed both by key and by anchor cell. Range
//! watches keep anchors current across structural edits, and backing content is
//! fetched asynchronously with completions applied on the owning thread.

mod config;
mod error;
pub mod index;
pub mod loader;
pub mod service;
pub mod watch;

pub use config::CacheConfig;
pub use error::LoadError;
pub use index::{CacheEntry, LoadState, PositionIndexedCache};
pub use loader::{
    ContentStore, LoadCompletion, LoadedResource, NoRepaint, RepaintHook, ResourceLoader,
};
pub use service::{EntryDescriptor, ObserveOutcome, ResourceCacheService, ScopeCache};
pub use watch::{RangeWatchRegistry, WatchCallback, WatchEvent, WatchHandle};

#[cfg(test)]
mod tests;
