//! Background synchronization: keeping freshness records up to date.
//!
//! The synchronizer is fire-and-forget. Callers on the interactive path do
//! a single cheap record read; only when that says "stale" does anything
//! heavier happen, and failures of any kind degrade to "still stale, try
//! again on the next trigger" rather than surfacing to the user.

use crate::error::{PulseError, Result};
use crate::identity::RepoIdentity;
use crate::store::FreshnessStore;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// The remote synchronization operation, abstracted for testing.
///
/// Production code uses [`GitFetchRunner`]; tests substitute counting or
/// failing runners to pin down how often and under what conditions the
/// expensive operation actually runs.
pub trait SyncRunner {
    /// Synchronizes the repository at `root` with its remotes.
    fn run(&self, root: &Path) -> Result<()>;
}

/// Outcome of a [`maybe_sync`] attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The record was fresh; nothing ran. The dominant fast path.
    Fresh,
    /// Another process holds the sync lock; skipped.
    Locked,
    /// The sync ran and the record was updated.
    Synced,
    /// The sync ran and failed; nothing was persisted.
    Failed,
}

/// Synchronizes one repository if its freshness record is stale.
///
/// The algorithm:
/// 1. Read the record once. Age below `window_secs` (absent meaning
///    infinitely old) is the fast path: return [`SyncOutcome::Fresh`]
///    without touching the lock or spawning anything.
/// 2. Acquire the per-identity lock; contention means another session is
///    already syncing, so skip.
/// 3. Re-check freshness under the lock -- the other session may have
///    finished between our read and our acquisition.
/// 4. Run the runner. On success, advance the record to the current time,
///    sampled again after the runner returns -- a fetch that takes a
///    meaningful fraction of the window must not produce a record that is
///    born stale. On failure, persist nothing; the next trigger past the
///    window retries naturally.
///
/// The lock guard releases on every path out of this function, including
/// panics inside the runner. A process killed outright leaves its marker
/// behind, which later callers reclaim by owner-liveness and age.
///
/// Never returns an error: store problems on this path degrade to
/// [`SyncOutcome::Failed`].
pub fn maybe_sync(
    store: &FreshnessStore,
    id: &RepoIdentity,
    root: &Path,
    runner: &dyn SyncRunner,
    window_secs: u64,
    lock_grace_secs: i64,
    now: impl Fn() -> i64,
) -> SyncOutcome {
    let started = now();
    if is_within_window(store, id, window_secs, started) {
        return SyncOutcome::Fresh;
    }

    let guard = match store.acquire_lock(id, started, lock_grace_secs) {
        Ok(Some(guard)) => guard,
        Ok(None) => return SyncOutcome::Locked,
        Err(e) => {
            debug!(error = %e, "could not acquire sync lock");
            return SyncOutcome::Failed;
        }
    };

    // Double-check under the lock: a concurrent sync may have landed
    // between the fast-path read and the acquisition.
    if is_within_window(store, id, window_secs, started) {
        guard.release();
        return SyncOutcome::Fresh;
    }

    let outcome = match runner.run(root) {
        Ok(()) => match store.write(id, now()) {
            Ok(()) => SyncOutcome::Synced,
            Err(e) => {
                warn!(error = %e, "sync succeeded but record write failed");
                SyncOutcome::Failed
            }
        },
        Err(e) => {
            // Transport failures are expected (offline, auth, slow remote).
            // Swallow them; the record stays stale and we retry later.
            debug!(root = %root.display(), error = %e, "background sync failed");
            SyncOutcome::Failed
        }
    };

    guard.release();
    outcome
}

/// Records that a synchronization already happened (e.g. the user ran an
/// explicit pull or fetch). Writes directly, bypassing the lock and the
/// runner -- the work is already done, only the timestamp needs advancing.
pub fn record_manual_sync(store: &FreshnessStore, id: &RepoIdentity, now: i64) -> Result<()> {
    store.write(id, now)
}

fn is_within_window(store: &FreshnessStore, id: &RepoIdentity, window_secs: u64, now: i64) -> bool {
    match store.read(id) {
        Some(record) => {
            let age = record.age_secs(now);
            age >= 0 && (age as u64) < window_secs
        }
        None => false,
    }
}

/// Production sync runner: `git fetch` over all remotes, pruning deleted
/// remote branches and fetching tags, with a hard wall-clock timeout.
pub struct GitFetchRunner {
    timeout: Duration,
}

impl GitFetchRunner {
    /// Creates a runner with the given fetch timeout.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl SyncRunner for GitFetchRunner {
    fn run(&self, root: &Path) -> Result<()> {
        let mut child = Command::new("git")
            .args(["fetch", "--all", "--prune", "--tags", "--quiet"])
            .current_dir(root)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    PulseError::GitNotFound
                } else {
                    PulseError::Io(e)
                }
            })?;

        // Network fetches can hang indefinitely; poll with an overall
        // deadline and kill the child when it passes.
        let start = Instant::now();
        loop {
            match child.try_wait()? {
                Some(status) => {
                    if status.success() {
                        return Ok(());
                    }
                    let stderr = read_trailing_stderr(&mut child);
                    return Err(PulseError::GitFailed {
                        status: status.code().unwrap_or(-1),
                        stderr,
                    });
                }
                None => {
                    if start.elapsed() > self.timeout {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(PulseError::GitTimeout {
                            secs: self.timeout.as_secs(),
                        });
                    }
                    std::thread::sleep(Duration::from_millis(50));
                }
            }
        }
    }
}

/// Drains whatever git left on stderr, trimmed to its last line.
fn read_trailing_stderr(child: &mut std::process::Child) -> String {
    use std::io::Read;

    let mut buf = String::new();
    if let Some(mut stderr) = child.stderr.take() {
        let _ = stderr.read_to_string(&mut buf);
    }
    buf.lines().last().unwrap_or("").to_string()
}
