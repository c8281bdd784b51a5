//! Scenario: fresh clone through its first sync and window expiry.

use crate::harness::{CountingRunner, MockClock, TestWorkspace};
use pulse_core::TriggerOutcome;

#[test]
fn first_sync_then_fresh_for_a_window() {
    let ws = TestWorkspace::empty().unwrap();
    let repo = ws.fake_repo("project").unwrap();
    let clock = MockClock::new();
    let cache = ws.cache(&clock).unwrap();
    let runner = CountingRunner::new();

    // No record exists: the repository is stale and the first trigger syncs.
    let (id, _) = cache.resolve(&repo).unwrap().unwrap();
    assert!(!cache.is_fresh(&id));
    assert_eq!(cache.maybe_sync(&repo, &runner), TriggerOutcome::Synced);
    assert_eq!(runner.calls(), 1);
    assert!(cache.is_fresh(&id));

    // Every trigger inside the window is a fast-path no-op.
    for _ in 0..5 {
        clock.advance_secs(60);
        assert_eq!(cache.maybe_sync(&repo, &runner), TriggerOutcome::Fresh);
    }
    assert_eq!(runner.calls(), 1);

    // Once the window elapses, the next trigger syncs again.
    clock.advance_secs(900);
    assert!(!cache.is_fresh(&id));
    assert_eq!(cache.maybe_sync(&repo, &runner), TriggerOutcome::Synced);
    assert_eq!(runner.calls(), 2);
}

#[test]
fn distinct_repositories_are_independent() {
    let ws = TestWorkspace::empty().unwrap();
    let repo_a = ws.fake_repo("alpha").unwrap();
    let repo_b = ws.fake_repo("beta").unwrap();
    let clock = MockClock::new();
    let cache = ws.cache(&clock).unwrap();
    let runner = CountingRunner::new();

    assert_eq!(cache.maybe_sync(&repo_a, &runner), TriggerOutcome::Synced);

    // Syncing one repository says nothing about the other.
    let (id_b, _) = cache.resolve(&repo_b).unwrap().unwrap();
    assert!(!cache.is_fresh(&id_b));
    assert_eq!(cache.maybe_sync(&repo_b, &runner), TriggerOutcome::Synced);
    assert_eq!(runner.calls(), 2);
}

#[test]
fn subdirectory_triggers_hit_the_same_record() {
    let ws = TestWorkspace::empty().unwrap();
    let repo = ws.fake_repo("project").unwrap();
    let sub = repo.join("src/deeply/nested");
    std::fs::create_dir_all(&sub).unwrap();

    let clock = MockClock::new();
    let cache = ws.cache(&clock).unwrap();
    let runner = CountingRunner::new();

    // Sync from the root, then trigger from a subdirectory: same identity,
    // so the record is already fresh.
    assert_eq!(cache.maybe_sync(&repo, &runner), TriggerOutcome::Synced);
    assert_eq!(cache.maybe_sync(&sub, &runner), TriggerOutcome::Fresh);
    assert_eq!(runner.calls(), 1);
}

#[test]
fn disabled_cache_never_syncs() {
    let ws = TestWorkspace::empty().unwrap();
    let repo = ws.fake_repo("project").unwrap();
    let clock = MockClock::new();

    let mut config = pulse_core::Config::default();
    config.sync.enabled = false;
    let cache = ws.cache_with_config(&clock, config).unwrap();
    let runner = CountingRunner::new();

    assert_eq!(cache.maybe_sync(&repo, &runner), TriggerOutcome::Disabled);
    assert_eq!(runner.calls(), 0);
}
