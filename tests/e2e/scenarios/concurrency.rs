//! Scenario: two terminals trigger a sync for the same stale repository.

use crate::harness::{CountingRunner, MockClock, TestWorkspace};
use pulse_core::TriggerOutcome;
use std::sync::{Arc, Barrier};
use std::time::Duration;

#[test]
fn concurrent_triggers_sync_exactly_once() {
    let ws = TestWorkspace::empty().unwrap();
    let repo = ws.fake_repo("project").unwrap();
    let clock = MockClock::new();
    let cache = Arc::new(ws.cache(&clock).unwrap());

    // Hold the "fetch" open long enough that the two attempts overlap.
    let runner = Arc::new(CountingRunner::slow(Duration::from_millis(250)));
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let cache = cache.clone();
            let runner = runner.clone();
            let barrier = barrier.clone();
            let repo = repo.clone();
            std::thread::spawn(move || {
                barrier.wait();
                cache.maybe_sync(&repo, runner.as_ref())
            })
        })
        .collect();

    let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(runner.calls(), 1, "exactly one network sync must occur");
    assert!(outcomes.contains(&TriggerOutcome::Synced));
    assert!(outcomes.contains(&TriggerOutcome::Locked));
}

#[test]
fn losing_terminal_sees_fresh_record_afterwards() {
    let ws = TestWorkspace::empty().unwrap();
    let repo = ws.fake_repo("project").unwrap();
    let clock = MockClock::new();
    let cache = ws.cache(&clock).unwrap();
    let runner = CountingRunner::new();

    assert_eq!(cache.maybe_sync(&repo, &runner), TriggerOutcome::Synced);

    // The terminal that skipped (or any later one) now takes the fast path.
    assert_eq!(cache.maybe_sync(&repo, &runner), TriggerOutcome::Fresh);
    assert_eq!(runner.calls(), 1);
}

#[test]
fn crashed_sync_lock_is_reclaimed() {
    let ws = TestWorkspace::empty().unwrap();
    let repo = ws.fake_repo("project").unwrap();
    let clock = MockClock::new();
    let cache = ws.cache(&clock).unwrap();
    let store = ws.store().unwrap();

    // Simulate a sync process that died holding the lock: a marker with a
    // PID that no longer exists.
    let (id, _) = cache.resolve(&repo).unwrap().unwrap();
    let marker = store.root().join("marks").join(format!("{}.lock", id.as_hex()));
    std::fs::write(&marker, format!("999999999\n{}\n", clock.now())).unwrap();

    // The next trigger reclaims the abandoned lock and syncs.
    let runner = CountingRunner::new();
    assert_eq!(cache.maybe_sync(&repo, &runner), TriggerOutcome::Synced);
    assert_eq!(runner.calls(), 1);
}
