//! Scenario: the user runs an explicit pull; no background sync is needed.

use crate::harness::{CountingRunner, MockClock, TestWorkspace};
use pulse_core::TriggerOutcome;

#[test]
fn manual_pull_marks_fresh_without_background_sync() {
    let ws = TestWorkspace::empty().unwrap();
    let repo = ws.fake_repo("project").unwrap();
    let clock = MockClock::new();
    let cache = ws.cache(&clock).unwrap();

    // The pull already happened; the wrapper records it directly.
    assert!(cache.mark_synced(&repo).unwrap());

    let (id, _) = cache.resolve(&repo).unwrap().unwrap();
    assert!(cache.is_fresh(&id), "manual mark must count immediately");

    // Subsequent triggers take the fast path: no lock, no fetch.
    let runner = CountingRunner::new();
    assert_eq!(cache.maybe_sync(&repo, &runner), TriggerOutcome::Fresh);
    assert_eq!(runner.calls(), 0);
}

#[test]
fn manual_mark_lands_even_while_a_sync_holds_the_lock() {
    let ws = TestWorkspace::empty().unwrap();
    let repo = ws.fake_repo("project").unwrap();
    let clock = MockClock::new();
    let cache = ws.cache(&clock).unwrap();
    let store = ws.store().unwrap();

    let (id, _) = cache.resolve(&repo).unwrap().unwrap();
    let _held = store.acquire_lock(&id, clock.now(), 200).unwrap().unwrap();

    // The mark bypasses the lock machinery entirely.
    assert!(cache.mark_synced(&repo).unwrap());
    assert!(cache.is_fresh(&id));
}

#[test]
fn mark_outside_a_repository_is_a_no_op() {
    let ws = TestWorkspace::empty().unwrap();
    let plain = ws.plain_dir("not-a-repo").unwrap();
    let clock = MockClock::new();
    let cache = ws.cache(&clock).unwrap();

    assert!(!cache.mark_synced(&plain).unwrap());
}
