use gridanchor_common::{ResourceKey, StructuralEdit, UnitId};

use super::common::{MemoryStore, RecordingRepaint, book, service, sheet};
use crate::{LoadError, LoadState, ObserveOutcome};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_one_load_per_key_while_in_flight() {
    let store = MemoryStore::gated(&[("r", b"1")]);
    let mut svc = service(store.clone(), RecordingRepaint::showing(book()));
    let key = ResourceKey::from("k");

    assert_eq!(
        svc.observe(&book(), &sheet(), key.clone(), "r", 0, 0),
        ObserveOutcome::Created
    );
    for _ in 0..3 {
        assert_eq!(
            svc.observe(&book(), &sheet(), key.clone(), "r", 0, 0),
            ObserveOutcome::AlreadyCached
        );
    }
    assert_eq!(svc.loads_in_flight(), 1);
    store.open(1);
    svc.settle().await;
    assert_eq!(store.calls(), 1);
    assert_eq!(
        svc.observe(&book(), &sheet(), key, "r", 0, 0),
        ObserveOutcome::AlreadyCached
    );
    assert_eq!(store.calls(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failed_load_is_retained_and_not_retried() {
    let store = MemoryStore::new(&[("ok", b"fine")]);
    let repaint = RecordingRepaint::showing(book());
    let mut svc = service(store.clone(), repaint.clone());
    let bad = ResourceKey::from("bad");
    let good = ResourceKey::from("good");
    svc.observe(&book(), &sheet(), bad.clone(), "missing", 0, 0);
    svc.observe(&book(), &sheet(), good.clone(), "ok", 0, 0);
    svc.settle().await;

    let at = svc.get_by_position(&book(), &sheet(), 0, 0);
    assert_eq!(
        at[&bad].state,
        LoadState::Failed(LoadError::NotFound("missing".into()))
    );
    assert_eq!(at[&good].state, LoadState::Loaded);
    assert!(svc.get_by_key(&book(), &sheet(), &bad).is_none());
    // Failures still trigger a repaint so a placeholder can be drawn.
    assert_eq!(repaint.count(), 2);

    svc.observe(&book(), &sheet(), bad.clone(), "missing", 0, 0);
    svc.settle().await;
    assert_eq!(store.calls(), 2);

    // Only an explicit retry goes back to the store.
    assert!(svc.retry_failed(&book(), &sheet(), &bad));
    assert_eq!(
        svc.describe(&book(), &sheet(), &bad).unwrap().state,
        LoadState::Loading
    );
    svc.settle().await;
    assert_eq!(store.calls(), 3);
    assert!(!svc.retry_failed(&book(), &sheet(), &good));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_completion_for_deleted_entry_is_dropped() {
    let store = MemoryStore::gated(&[("r", b"1")]);
    let repaint = RecordingRepaint::showing(book());
    let mut svc = service(store.clone(), repaint.clone());
    let key = ResourceKey::from("k");
    svc.observe(&book(), &sheet(), key.clone(), "r", 3, 3);
    assert!(svc.remove(&book(), &sheet(), &key));
    assert!(!svc.remove(&book(), &sheet(), &key));

    store.open(1);
    assert_eq!(svc.settle().await, 1);
    assert!(svc.describe(&book(), &sheet(), &key).is_none());
    assert_eq!(repaint.count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_load_finishing_after_anchor_moved_updates_entry() {
    let store = MemoryStore::gated(&[("r", b"1")]);
    let mut svc = service(store.clone(), RecordingRepaint::showing(book()));
    let key = ResourceKey::from("k");
    svc.observe(&book(), &sheet(), key.clone(), "r", 3, 3);
    let insert = StructuralEdit::InsertColumns {
        sub_unit: sheet(),
        before: 0,
        count: 4,
    };
    svc.on_structural_edit(&book(), &insert).unwrap();

    store.open(1);
    svc.settle().await;
    let at = svc.get_by_position(&book(), &sheet(), 3, 7);
    assert_eq!(at[&key].state, LoadState::Loaded);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_repaint_only_for_active_unit() {
    let store = MemoryStore::new(&[("r", b"1")]);
    let repaint = RecordingRepaint::showing(UnitId::from("elsewhere"));
    let mut svc = service(store, repaint.clone());
    svc.observe(&book(), &sheet(), ResourceKey::from("k"), "r", 0, 0);
    svc.settle().await;
    assert_eq!(repaint.count(), 0);
    assert_eq!(
        svc.describe(&book(), &sheet(), &ResourceKey::from("k")).unwrap().state,
        LoadState::Loaded
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_apply_completions_is_non_blocking() {
    let store = MemoryStore::gated(&[("r", b"1")]);
    let mut svc = service(store.clone(), RecordingRepaint::showing(book()));
    svc.observe(&book(), &sheet(), ResourceKey::from("k"), "r", 0, 0);
    assert_eq!(svc.apply_completions(), 0);
    store.open(1);
    svc.settle().await;
    assert_eq!(svc.apply_completions(), 0);
    assert_eq!(svc.loads_in_flight(), 0);
}
