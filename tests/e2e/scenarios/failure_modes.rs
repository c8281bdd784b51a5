//! Scenario: everything degrades to "stale, retry later" -- never an error.

use crate::harness::{CountingRunner, FailingRunner, MockClock, TestWorkspace};
use pulse_core::{Indicator, TriggerOutcome};

#[test]
fn failed_sync_leaves_record_stale_and_retries_later() {
    let ws = TestWorkspace::empty().unwrap();
    let repo = ws.fake_repo("project").unwrap();
    let clock = MockClock::new();
    let cache = ws.cache(&clock).unwrap();

    // The remote is unreachable: the attempt fails quietly.
    assert_eq!(
        cache.maybe_sync(&repo, &FailingRunner),
        TriggerOutcome::Failed
    );
    assert!(cache.last_sync(&repo).unwrap().is_none());

    // The failure did not poison anything: the next trigger attempts again
    // and succeeds once the network is back.
    let runner = CountingRunner::new();
    assert_eq!(cache.maybe_sync(&repo, &runner), TriggerOutcome::Synced);
    assert_eq!(runner.calls(), 1);
}

#[test]
fn corrupt_record_reads_as_stale() {
    let ws = TestWorkspace::empty().unwrap();
    let repo = ws.fake_repo("project").unwrap();
    let clock = MockClock::new();
    let cache = ws.cache(&clock).unwrap();
    let store = ws.store().unwrap();

    cache.mark_synced(&repo).unwrap();

    // Scribble over the record on disk.
    let (id, _) = cache.resolve(&repo).unwrap().unwrap();
    let record_path = store.root().join("marks").join(id.as_hex());
    std::fs::write(&record_path, "\x00\x01 not a timestamp").unwrap();

    // Fail open: stale, not a crash.
    assert!(!cache.is_fresh(&id));
    let runner = CountingRunner::new();
    assert_eq!(cache.maybe_sync(&repo, &runner), TriggerOutcome::Synced);
    assert_eq!(runner.calls(), 1);
    assert!(cache.is_fresh(&id), "sync must repair the corrupt record");
}

#[test]
fn status_outside_a_repository_is_silent() {
    let ws = TestWorkspace::empty().unwrap();
    let plain = ws.plain_dir("not-a-repo").unwrap();
    let clock = MockClock::new();
    let cache = ws.cache(&clock).unwrap();

    assert_eq!(cache.status(&plain), Indicator::Silent);
}

#[test]
fn reset_clears_record_and_lock() {
    let ws = TestWorkspace::empty().unwrap();
    let repo = ws.fake_repo("project").unwrap();
    let clock = MockClock::new();
    let cache = ws.cache(&clock).unwrap();
    let store = ws.store().unwrap();

    cache.mark_synced(&repo).unwrap();
    let (id, _) = cache.resolve(&repo).unwrap().unwrap();
    let _stale_marker = std::fs::write(
        store.root().join("marks").join(format!("{}.lock", id.as_hex())),
        "999999999\n0\n",
    );

    assert!(cache.reset(&repo).unwrap());
    assert!(cache.last_sync(&repo).unwrap().is_none());
    assert!(store.acquire_lock(&id, clock.now(), 200).unwrap().is_some());
}
