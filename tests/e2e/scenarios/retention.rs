//! Scenario: storage stays bounded as repositories fall out of use.

use crate::harness::{MockClock, TestWorkspace};

#[test]
fn idle_records_are_swept_after_retention() {
    let ws = TestWorkspace::empty().unwrap();
    let active = ws.fake_repo("active").unwrap();
    let idle = ws.fake_repo("idle").unwrap();
    let clock = MockClock::new();
    let cache = ws.cache(&clock).unwrap();

    cache.mark_synced(&idle).unwrap();
    cache.mark_synced(&active).unwrap();

    // The active repository gets marked again mid-way; the idle one doesn't.
    clock.advance_days(15);
    cache.mark_synced(&active).unwrap();
    clock.advance_days(16);

    let report = cache.sweep().unwrap();
    assert_eq!(report.records_removed, 1);
    assert!(cache.last_sync(&idle).unwrap().is_none());
    assert!(cache.last_sync(&active).unwrap().is_some());
}

#[test]
fn record_just_inside_retention_survives() {
    let ws = TestWorkspace::empty().unwrap();
    let repo = ws.fake_repo("project").unwrap();
    let clock = MockClock::new();
    let cache = ws.cache(&clock).unwrap();

    cache.mark_synced(&repo).unwrap();

    // One second short of 30 days: retained.
    clock.advance(std::time::Duration::from_secs(30 * 86_400 - 1));
    let report = cache.sweep().unwrap();
    assert_eq!(report.records_removed, 0);
    assert!(cache.last_sync(&repo).unwrap().is_some());

    // Two seconds later the record is past the window and goes.
    clock.advance(std::time::Duration::from_secs(2));
    let report = cache.sweep().unwrap();
    assert_eq!(report.records_removed, 1);
}

#[test]
fn opportunistic_sweep_rides_the_write_path() {
    let ws = TestWorkspace::empty().unwrap();
    let idle = ws.fake_repo("idle").unwrap();
    let active = ws.fake_repo("active").unwrap();
    let clock = MockClock::new();
    let cache = ws.cache(&clock).unwrap();

    cache.mark_synced(&idle).unwrap();

    // 31 days later, an ordinary mark on another repository is enough to
    // trigger cleanup -- no explicit sweep command involved.
    clock.advance_days(31);
    cache.mark_synced(&active).unwrap();

    assert!(cache.last_sync(&idle).unwrap().is_none());
}
