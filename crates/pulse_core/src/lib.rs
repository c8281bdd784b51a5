//! Pulse Core Library
//!
//! A smart git-fetch freshness cache for shell prompts, providing:
//! - Stable per-repository cache identities
//! - A durable, lock-protected freshness store
//! - Opportunistic background synchronization
//! - A pure trust evaluator for prompt rendering
//!
//! The cache answers one question per repository: "when did we last
//! successfully synchronize with the remote?" -- cheaply enough to ask on
//! every prompt render, without a daemon and without ever blocking the
//! interactive session.
//!
//! # Quick Start
//!
//! ```
//! use pulse_core::{FreshnessStore, RepoIdentity};
//! use tempfile::TempDir;
//!
//! let tmp = TempDir::new().unwrap();
//! let store = FreshnessStore::open(tmp.path()).unwrap();
//!
//! let id = RepoIdentity::for_root(std::path::Path::new("/home/me/proj"));
//!
//! // No record yet: stale.
//! assert!(store.read(&id).is_none());
//!
//! // Record a sync; readers see it immediately.
//! store.write(&id, 1_700_000_000).unwrap();
//! assert_eq!(store.read(&id).unwrap().last_sync_unix, 1_700_000_000);
//! ```
//!
//! # Concurrency model
//!
//! Every terminal session is an independent OS process; the filesystem-backed
//! store and its lock markers are the only shared state. Records are written
//! atomically (temp file + rename) and the per-repository sync lock is
//! exclusive across processes, so at most one fetch runs per repository at
//! any time:
//!
//! ```
//! use pulse_core::{FreshnessStore, RepoIdentity};
//! use tempfile::TempDir;
//!
//! let tmp = TempDir::new().unwrap();
//! let store = FreshnessStore::open(tmp.path()).unwrap();
//! let id = RepoIdentity::from_bytes([7; 32]);
//!
//! let guard = store.acquire_lock(&id, 1_700_000_000, 200).unwrap();
//! assert!(guard.is_some());
//! // A second attempt observes contention and skips.
//! assert!(store.acquire_lock(&id, 1_700_000_000, 200).unwrap().is_none());
//! ```

mod cache;
mod config;
mod error;
mod identity;
mod status;
mod store;
mod sync;

pub use cache::{PulseCache, TriggerOutcome};
pub use config::{Config, SweepConfig, SyncConfig};
pub use error::{PulseError, Result};
pub use identity::{discover_root, resolve, RepoIdentity};
pub use status::{indicator, is_fresh, upstream_divergence, Divergence, Indicator};
pub use store::{FreshnessRecord, FreshnessStore, LockGuard, SweepReport};
pub use sync::{maybe_sync, record_manual_sync, GitFetchRunner, SyncOutcome, SyncRunner};

/// Clock seam for [`PulseCache`].
///
/// Freshness and retention are functions of wall-clock time; implementing
/// this (or passing a plain closure, via the blanket impl) lets tests drive
/// the clock. Installed with [`PulseCache::with_time_provider`]; when none
/// is set, the cache reads the system clock.
pub trait TimeProvider: Send + Sync {
    /// Returns the current Unix timestamp in seconds.
    fn now(&self) -> i64;
}

impl<F> TimeProvider for F
where
    F: Fn() -> i64 + Send + Sync,
{
    fn now(&self) -> i64 {
        self()
    }
}
