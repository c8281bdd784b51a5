//! Cache handle providing the main pulse API.

use crate::config::Config;
use crate::error::Result;
use crate::identity::{self, RepoIdentity};
use crate::status::{self, Indicator};
use crate::store::{FreshnessStore, SweepReport};
use crate::sync::{self, SyncOutcome, SyncRunner};
use crate::TimeProvider;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Outcome of a session-lifecycle trigger (startup, chdir, pre-command).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// Background sync is turned off; nothing happened.
    Disabled,
    /// The directory is not inside a working tree; nothing happened.
    NotARepository,
    /// The record was fresh; nothing ran.
    Fresh,
    /// Another process is already syncing this repository.
    Locked,
    /// A sync ran and the record was updated.
    Synced,
    /// A sync ran and failed; the record is unchanged.
    Failed,
}

impl From<SyncOutcome> for TriggerOutcome {
    fn from(outcome: SyncOutcome) -> Self {
        match outcome {
            SyncOutcome::Fresh => Self::Fresh,
            SyncOutcome::Locked => Self::Locked,
            SyncOutcome::Synced => Self::Synced,
            SyncOutcome::Failed => Self::Failed,
        }
    }
}

/// Pulse cache handle.
///
/// Ties the identity resolver, freshness store, synchronizer, and sweeper
/// together behind the operations the shell hooks and the prompt renderer
/// call. One handle per process; all cross-process coordination goes
/// through the store.
pub struct PulseCache {
    /// Durable freshness store.
    store: FreshnessStore,
    /// Loaded configuration (defaults when no config file exists).
    config: Config,
    /// Time provider for testing (None = use system time).
    time_provider: Option<std::sync::Arc<dyn TimeProvider>>,
    /// Whether `PULSE_DISABLE` was set when the handle was created.
    env_disabled: bool,
}

impl PulseCache {
    /// Opens the cache at its default location, loading configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the store directory cannot be resolved or
    /// created, or if an existing config file is malformed.
    pub fn open() -> Result<Self> {
        let store = FreshnessStore::open_default()?;
        let config = Config::load(store.root())?;
        Ok(Self {
            store,
            config,
            time_provider: None,
            env_disabled: env_opt_out(),
        })
    }

    /// Creates a cache over an explicit store and configuration.
    ///
    /// Used by tests and by embedders that manage their own directories.
    pub fn with_store(store: FreshnessStore, config: Config) -> Self {
        Self {
            store,
            config,
            time_provider: None,
            env_disabled: env_opt_out(),
        }
    }

    /// Sets a custom time provider for testing.
    ///
    /// Freshness and sweeping are functions of wall-clock time; injecting a
    /// controlled clock makes window and retention behavior testable. Any
    /// [`TimeProvider`] works, including a plain closure. In production,
    /// just use `open()` to get system time.
    pub fn with_time_provider(mut self, provider: impl TimeProvider + 'static) -> Self {
        self.time_provider = Some(std::sync::Arc::new(provider));
        self
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &FreshnessStore {
        &self.store
    }

    /// Returns the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Whether background synchronization is enabled.
    ///
    /// False when the config opts out or the `PULSE_DISABLE` environment
    /// variable was set (any value) when the handle was created. Handles
    /// are short-lived, one per shell-hook invocation, so snapshotting the
    /// variable at creation matches its process-level semantics.
    pub fn enabled(&self) -> bool {
        self.config.sync.enabled && !self.env_disabled
    }

    /// Resolves a working directory to its repository identity and root.
    pub fn resolve(&self, dir: &Path) -> Result<Option<(RepoIdentity, PathBuf)>> {
        identity::resolve(dir)
    }

    /// Whether the record for `id` is fresh right now.
    pub fn is_fresh(&self, id: &RepoIdentity) -> bool {
        status::is_fresh(
            self.store.read(id).as_ref(),
            self.config.sync.freshness_window_secs,
            self.now(),
        )
    }

    /// Session-lifecycle trigger: sync the repository containing `dir` if
    /// its record is stale.
    ///
    /// Fire-and-forget semantics: never errors, never blocks beyond the
    /// runner itself. Callers that must not wait run this in a detached
    /// worker process and only pay for the fast-path read inline.
    pub fn maybe_sync(&self, dir: &Path, runner: &dyn SyncRunner) -> TriggerOutcome {
        if !self.enabled() {
            return TriggerOutcome::Disabled;
        }

        let (id, root) = match self.resolve(dir) {
            Ok(Some(resolved)) => resolved,
            _ => return TriggerOutcome::NotARepository,
        };

        let outcome = sync::maybe_sync(
            &self.store,
            &id,
            &root,
            runner,
            self.config.sync.freshness_window_secs,
            self.config.sync.lock_grace_secs(),
            || self.now(),
        );

        if outcome == SyncOutcome::Synced {
            self.opportunistic_sweep(self.now());
        }

        outcome.into()
    }

    /// Records that the user already synchronized (manual pull/fetch).
    ///
    /// Writes the record directly, bypassing the lock and the runner.
    /// Returns false when `dir` is not inside a working tree.
    pub fn mark_synced(&self, dir: &Path) -> Result<bool> {
        let Some((id, _root)) = self.resolve(dir)? else {
            return Ok(false);
        };

        let now = self.now();
        sync::record_manual_sync(&self.store, &id, now)?;
        self.opportunistic_sweep(now);
        Ok(true)
    }

    /// Display decision for the prompt renderer.
    ///
    /// Never errors: anything that goes wrong resolves to
    /// [`Indicator::Silent`]. When sync is disabled the "synced" claim is
    /// withheld, but divergence counts still show -- they come from the
    /// local object database and stay trustworthy.
    pub fn status(&self, dir: &Path) -> Indicator {
        let Ok(Some((id, root))) = self.resolve(dir) else {
            return Indicator::Silent;
        };

        let fresh = self.enabled() && self.is_fresh(&id);
        let divergence = match status::upstream_divergence(&root) {
            Ok(d) => d,
            Err(e) => {
                debug!(error = %e, "divergence query failed");
                None
            }
        };

        status::indicator(divergence.as_ref(), fresh)
    }

    /// Last successful sync time for the repository containing `dir`.
    pub fn last_sync(&self, dir: &Path) -> Result<Option<i64>> {
        Ok(self
            .resolve(dir)?
            .and_then(|(id, _)| self.store.read(&id))
            .map(|r| r.last_sync_unix))
    }

    /// Runs a full maintenance sweep immediately.
    pub fn sweep(&self) -> Result<SweepReport> {
        self.store.sweep(
            self.config.sweep.retention_secs(),
            self.config.sync.lock_grace_secs(),
            self.now(),
        )
    }

    /// Forgets the record and lock for the repository containing `dir`.
    ///
    /// Returns false when `dir` is not inside a working tree.
    pub fn reset(&self, dir: &Path) -> Result<bool> {
        let Some((id, _root)) = self.resolve(dir)? else {
            return Ok(false);
        };
        self.store.delete(&id)?;
        Ok(true)
    }

    fn now(&self) -> i64 {
        match &self.time_provider {
            Some(provider) => provider.now(),
            None => SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0),
        }
    }

    /// Piggybacks a sweep on the write path; failures only get logged.
    fn opportunistic_sweep(&self, now: i64) {
        let result = self.store.maybe_sweep(
            self.config.sweep.interval_secs as i64,
            self.config.sweep.retention_secs(),
            self.config.sync.lock_grace_secs(),
            now,
        );
        match result {
            Ok(Some(report)) => {
                debug!(
                    records_removed = report.records_removed,
                    locks_removed = report.locks_removed,
                    "opportunistic sweep"
                );
            }
            Ok(None) => {}
            Err(e) => debug!(error = %e, "opportunistic sweep failed"),
        }
    }
}

fn env_opt_out() -> bool {
    std::env::var_os("PULSE_DISABLE").is_some()
}
