//! Durable freshness store: per-repository timestamps and sync locks.
//!
//! One small text file per repository identity under `marks/`, plus an
//! existence-only lock marker per identity. The filesystem is the only
//! shared state between terminal sessions, so every write is atomic
//! (temp file + rename) and every lock is exclusive across processes.

use crate::error::{PulseError, Result};
use crate::identity::RepoIdentity;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Name of the stamp file recording the last opportunistic sweep.
const SWEEP_STAMP: &str = "SWEEP";

/// Freshness record for one repository: when we last synced with its remotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessRecord {
    /// Unix timestamp (seconds) of the last successful synchronization.
    pub last_sync_unix: i64,
}

impl FreshnessRecord {
    /// Seconds elapsed since the last sync, given the current time.
    pub fn age_secs(&self, now: i64) -> i64 {
        now - self.last_sync_unix
    }
}

/// Report from a maintenance sweep.
#[derive(Debug, Default)]
pub struct SweepReport {
    /// Number of freshness records removed.
    pub records_removed: usize,

    /// Number of lock markers reclaimed.
    pub locks_removed: usize,

    /// Errors encountered during the sweep (non-fatal).
    pub errors: Vec<String>,
}

/// Filesystem-backed store mapping [`RepoIdentity`] to [`FreshnessRecord`].
///
/// Records live under `<root>/marks/<hex>` as single-line epoch timestamps;
/// lock markers are `<hex>.lock` in the same directory. The store lives in
/// the per-user cache area, outside any repository, so entries survive
/// repository deletion and are shared by every terminal on the machine.
pub struct FreshnessStore {
    root: PathBuf,
}

impl FreshnessStore {
    /// Opens the store at the default location.
    ///
    /// `PULSE_DIR` overrides the location; otherwise the platform cache
    /// directory is used (`~/.cache/pulse` on Linux).
    ///
    /// # Errors
    ///
    /// Returns `NoCacheDir` if no location can be resolved, or an I/O error
    /// if the directory cannot be created.
    pub fn open_default() -> Result<Self> {
        let root = match std::env::var_os("PULSE_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => dirs::cache_dir().ok_or(PulseError::NoCacheDir)?.join("pulse"),
        };
        Self::open(root)
    }

    /// Opens (creating if needed) a store rooted at the given directory.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join("marks"))?;
        Ok(Self { root })
    }

    /// Returns the store's root directory (parent of `marks/`).
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn marks_dir(&self) -> PathBuf {
        self.root.join("marks")
    }

    fn record_path(&self, id: &RepoIdentity) -> PathBuf {
        self.marks_dir().join(id.as_hex())
    }

    fn lock_path(&self, id: &RepoIdentity) -> PathBuf {
        self.marks_dir().join(format!("{}.lock", id.as_hex()))
    }

    /// Reads the freshness record for an identity.
    ///
    /// Never errors and never blocks: a missing, unreadable, or malformed
    /// record is reported as `None`, which downstream means "stale". The
    /// prompt path depends on this failing open rather than crashing.
    pub fn read(&self, id: &RepoIdentity) -> Option<FreshnessRecord> {
        let path = self.record_path(id);
        match read_record_file(&path) {
            Ok(record) => Some(record),
            Err(PulseError::Io(ref e)) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "unreadable freshness record, treating as stale");
                None
            }
        }
    }

    /// Writes the freshness record for an identity.
    ///
    /// Last-writer-wins, clamped monotonic: a timestamp older than the one
    /// already stored is discarded, so the record never moves backwards.
    /// The write is atomic (temp file + rename); a concurrent reader sees
    /// either the old value or the new one, never a partial file.
    pub fn write(&self, id: &RepoIdentity, epoch_secs: i64) -> Result<()> {
        if let Some(existing) = self.read(id) {
            if existing.last_sync_unix >= epoch_secs {
                return Ok(());
            }
        }
        write_record_file(&self.record_path(id), epoch_secs)
    }

    /// Removes the record and lock marker for one identity, if present.
    pub fn delete(&self, id: &RepoIdentity) -> Result<()> {
        remove_if_exists(&self.record_path(id))?;
        remove_if_exists(&self.lock_path(id))?;
        Ok(())
    }

    /// Attempts to acquire the per-identity sync lock.
    ///
    /// Returns `Ok(None)` when another live process holds the lock --
    /// contention is a "skip this attempt" signal, not an error. Abandoned
    /// markers (dead owner, malformed content, or older than `grace_secs`)
    /// are reclaimed and acquisition retried a bounded number of times.
    ///
    /// The lock is exclusive across processes: it is backed by an
    /// exclusively-created marker file, with an OS file lock taken as an
    /// extra guard where the filesystem supports one.
    pub fn acquire_lock(
        &self,
        id: &RepoIdentity,
        now: i64,
        grace_secs: i64,
    ) -> Result<Option<LockGuard>> {
        self.acquire_lock_with_retry(&self.lock_path(id), now, grace_secs, 0)
    }

    fn acquire_lock_with_retry(
        &self,
        lock_path: &Path,
        now: i64,
        grace_secs: i64,
        retry_count: u32,
    ) -> Result<Option<LockGuard>> {
        // Limit retries so two processes reclaiming in lockstep cannot spin.
        if retry_count > 2 {
            return Ok(None);
        }

        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(lock_path)
        {
            Ok(mut file) => {
                // Marker content: owner PID and creation time, for
                // liveness- and age-based reclamation by other processes.
                writeln!(file, "{}", std::process::id())?;
                writeln!(file, "{}", now)?;
                file.flush()?;

                // The marker is the lock other processes observe (via
                // `create_new`); the OS file lock is an extra guard.
                // Filesystems without lock support still get marker-based
                // exclusion, so an flock failure here must not strand the
                // marker we just created.
                if let Err(e) = file.try_lock_exclusive() {
                    debug!(error = %e, "OS file lock unavailable, relying on marker");
                }

                Ok(Some(LockGuard {
                    file: Some(file),
                    path: lock_path.to_path_buf(),
                }))
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                self.handle_existing_lock(lock_path, now, grace_secs, retry_count)
            }
            Err(e) => Err(PulseError::Io(e)),
        }
    }

    /// Decides whether an existing lock marker is live or reclaimable.
    fn handle_existing_lock(
        &self,
        lock_path: &Path,
        now: i64,
        grace_secs: i64,
        retry_count: u32,
    ) -> Result<Option<LockGuard>> {
        match fs::read_to_string(lock_path) {
            Ok(content) => {
                if let Some((pid, created)) = parse_lock_marker(&content) {
                    let age = now - created;
                    if is_process_alive(pid) && age <= grace_secs {
                        // Legitimately held: another session is syncing.
                        debug!(pid = pid, "sync lock held by live process, skipping");
                        return Ok(None);
                    }

                    warn!(
                        pid = pid,
                        age_secs = age,
                        "reclaiming abandoned sync lock"
                    );
                } else {
                    warn!(path = %lock_path.display(), "lock marker has invalid content, reclaiming");
                }

                if let Err(e) = fs::remove_file(lock_path) {
                    // Another process may have reclaimed it first.
                    if e.kind() != std::io::ErrorKind::NotFound {
                        return Err(PulseError::Io(e));
                    }
                }

                self.acquire_lock_with_retry(lock_path, now, grace_secs, retry_count + 1)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Released between our create attempt and the read.
                self.acquire_lock_with_retry(lock_path, now, grace_secs, retry_count + 1)
            }
            // Can't inspect the marker: assume it is held.
            Err(_) => Ok(None),
        }
    }

    /// Removes records and lock markers past their retention windows.
    ///
    /// A record is removed once its age exceeds `retention_secs`; a record
    /// exactly one second younger than the threshold is retained. Malformed
    /// records are removed outright. Lock markers are kept only while their
    /// owner is alive and within `lock_grace_secs`.
    pub fn sweep(&self, retention_secs: i64, lock_grace_secs: i64, now: i64) -> Result<SweepReport> {
        let mut report = SweepReport::default();

        for entry in fs::read_dir(self.marks_dir())? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            match path.extension().and_then(|s| s.to_str()) {
                Some("lock") => self.sweep_lock(&path, lock_grace_secs, now, &mut report),
                // In-flight atomic writes; never touch them.
                Some("tmp") => {}
                _ => self.sweep_record(&path, retention_secs, now, &mut report),
            }
        }

        Ok(report)
    }

    fn sweep_lock(&self, path: &Path, grace_secs: i64, now: i64, report: &mut SweepReport) {
        let live = fs::read_to_string(path)
            .ok()
            .and_then(|content| parse_lock_marker(&content))
            .is_some_and(|(pid, created)| is_process_alive(pid) && now - created <= grace_secs);

        if live {
            return;
        }

        match remove_if_exists(path) {
            Ok(()) => report.locks_removed += 1,
            Err(e) => report
                .errors
                .push(format!("failed to remove lock {}: {}", path.display(), e)),
        }
    }

    fn sweep_record(&self, path: &Path, retention_secs: i64, now: i64, report: &mut SweepReport) {
        let expired = match read_record_file(path) {
            Ok(record) => record.age_secs(now) > retention_secs,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "removing malformed record");
                true
            }
        };

        if !expired {
            return;
        }

        match remove_if_exists(path) {
            Ok(()) => report.records_removed += 1,
            Err(e) => report
                .errors
                .push(format!("failed to remove record {}: {}", path.display(), e)),
        }
    }

    /// Runs a sweep if enough time has passed since the previous one.
    ///
    /// Called opportunistically from the write path so storage stays bounded
    /// without any persistent daemon. The last-sweep time is a stamp file in
    /// the store root, in the same single-line epoch format as records.
    pub fn maybe_sweep(
        &self,
        interval_secs: i64,
        retention_secs: i64,
        lock_grace_secs: i64,
        now: i64,
    ) -> Result<Option<SweepReport>> {
        let stamp_path = self.root.join(SWEEP_STAMP);
        if let Ok(stamp) = read_record_file(&stamp_path) {
            if now - stamp.last_sync_unix < interval_secs {
                return Ok(None);
            }
        }

        let report = self.sweep(retention_secs, lock_grace_secs, now)?;
        write_record_file(&stamp_path, now)?;
        Ok(Some(report))
    }
}

/// RAII guard for a per-identity sync lock.
///
/// Dropping the guard closes the file handle (releasing the OS lock) and
/// removes the marker. Release is idempotent: the marker being gone
/// already is not an error.
pub struct LockGuard {
    /// The open marker file (holds the OS file lock).
    /// Wrapped in Option to allow taking ownership in Drop.
    file: Option<File>,
    /// Path to the marker file (for cleanup on drop).
    path: PathBuf,
}

impl LockGuard {
    /// Explicitly releases the lock. Equivalent to dropping the guard.
    pub fn release(self) {}
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            drop(file);
        }
        let _ = fs::remove_file(&self.path);
    }
}

/// Parses a lock marker: first line PID, second line creation epoch.
fn parse_lock_marker(content: &str) -> Option<(u32, i64)> {
    let mut lines = content.lines();
    let pid = lines.next()?.trim().parse::<u32>().ok()?;
    let created = lines.next()?.trim().parse::<i64>().ok()?;
    Some((pid, created))
}

/// Reads a single-line epoch file into a record.
fn read_record_file(path: &Path) -> Result<FreshnessRecord> {
    let content = fs::read_to_string(path)?;
    let trimmed = content.trim();

    let last_sync_unix = trimmed
        .parse::<i64>()
        .map_err(|_| PulseError::InvalidRecord {
            path: path.to_path_buf(),
            reason: format!("expected epoch seconds, got {:?}", trimmed),
        })?;

    Ok(FreshnessRecord { last_sync_unix })
}

/// Writes a single-line epoch file atomically.
///
/// Uses temp file + fsync + rename; the temp name carries the writer's PID
/// since manual marks write without holding the sync lock.
fn write_record_file(path: &Path, epoch_secs: i64) -> Result<()> {
    let tmp_path = path.with_extension(format!("{}.tmp", std::process::id()));

    {
        let mut file = File::create(&tmp_path)?;
        writeln!(file, "{}", epoch_secs)?;
        file.sync_all()?;
    }

    fs::rename(&tmp_path, path)?;

    // fsync parent directory (Unix-specific for crash safety)
    #[cfg(unix)]
    {
        if let Some(parent) = path.parent() {
            if let Ok(dir_file) = File::open(parent) {
                let _ = dir_file.sync_all();
            }
        }
    }

    Ok(())
}

fn remove_if_exists(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Check if a process with the given PID is still alive.
///
/// On Linux, checks /proc/{pid}/stat (zombies keep a /proc entry but this
/// distinguishes them). On other Unix systems, falls back to `kill -0`.
/// On non-Unix systems, conservatively assumes the process is alive, so
/// stale locks there are reclaimed by age alone.
#[cfg(target_os = "linux")]
fn is_process_alive(pid: u32) -> bool {
    std::path::Path::new(&format!("/proc/{}/stat", pid)).exists()
}

#[cfg(all(unix, not(target_os = "linux")))]
fn is_process_alive(pid: u32) -> bool {
    std::process::Command::new("kill")
        .args(["-0", &pid.to_string()])
        .output()
        .map(|o| o.status.success())
        .unwrap_or(true)
}

#[cfg(not(unix))]
fn is_process_alive(_pid: u32) -> bool {
    true
}
