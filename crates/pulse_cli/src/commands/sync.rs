//! Background sync trigger and the detached worker it spawns.

use anyhow::{Context, Result};
use pulse_core::{GitFetchRunner, PulseCache, TriggerOutcome};
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{debug, info};

/// Handle a session-lifecycle trigger (startup, chdir, pre-command).
///
/// This runs inside an interactive shell hook, so it must return almost
/// immediately: the only inline work is resolving the repository and one
/// freshness read. A stale record spawns a detached worker that outlives
/// this process and the shell that invoked it.
pub fn run(event: &str, foreground: bool) -> Result<()> {
    let cache = PulseCache::open()?;
    if !cache.enabled() {
        return Ok(());
    }

    let cwd = std::env::current_dir()?;
    let Some((id, root)) = cache.resolve(&cwd)? else {
        return Ok(());
    };

    // Fast path: fresh record, nothing to do. Sub-millisecond, no spawn.
    if cache.is_fresh(&id) {
        debug!(event = event, repo = %root.display(), "record fresh, skipping");
        return Ok(());
    }

    if foreground {
        return run_worker(&root);
    }

    debug!(event = event, repo = %root.display(), "record stale, spawning worker");
    spawn_worker(&cache, &root)
}

/// One synchronous sync attempt, run inside the detached worker process.
pub fn run_worker(root: &Path) -> Result<()> {
    let cache = PulseCache::open()?;
    let runner = GitFetchRunner::new(cache.config().sync.timeout());

    let outcome = cache.maybe_sync(root, &runner);
    match outcome {
        TriggerOutcome::Synced => info!(repo = %root.display(), "synced"),
        // Failures are deliberately quiet: the record stays stale and the
        // next trigger past the window retries.
        other => debug!(repo = %root.display(), outcome = ?other, "sync did not run"),
    }

    Ok(())
}

/// Respawns this executable as a `worker` subcommand, detached from the
/// invoking shell's session so it survives the shell exiting.
fn spawn_worker(cache: &PulseCache, root: &Path) -> Result<()> {
    let exe = std::env::current_exe().context("failed to resolve current executable")?;

    let log_dir = cache.store().root().join("logs");
    fs::create_dir_all(&log_dir).context("failed to create log directory")?;

    let open_log = || -> Result<(std::fs::File, std::fs::File)> {
        let stdout = open_worker_log(&log_dir)?;
        let stderr = stdout
            .try_clone()
            .context("failed to clone worker log handle")?;
        Ok((stdout, stderr))
    };

    // `setsid` puts the worker in its own session; without it the fetch
    // would die with the terminal.
    let (stdout, stderr) = open_log()?;
    let spawned = Command::new("setsid")
        .arg(&exe)
        .arg("worker")
        .arg(root)
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr))
        .spawn();

    let child = match spawned {
        Ok(child) => child,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!("setsid not available, spawning worker without a new session");
            let (stdout, stderr) = open_log()?;
            Command::new(&exe)
                .arg("worker")
                .arg(root)
                .stdin(Stdio::null())
                .stdout(Stdio::from(stdout))
                .stderr(Stdio::from(stderr))
                .spawn()
                .context("failed to spawn worker process")?
        }
        Err(err) => return Err(err).context("failed to spawn detached worker"),
    };

    debug!(pid = child.id(), "worker spawned");
    // Drop the handle: the worker continues on its own.
    drop(child);
    Ok(())
}

/// Cap on `worker.log` before it rotates to `worker.log.1`.
const WORKER_LOG_MAX_BYTES: u64 = 512 * 1024;

/// Opens the worker log for appending, rotating it first when it has grown
/// past the cap. At most two files ever exist, so the log directory stays
/// bounded without any cleanup task.
fn open_worker_log(log_dir: &Path) -> Result<std::fs::File> {
    let log_path = log_dir.join("worker.log");

    let oversized = fs::metadata(&log_path)
        .map(|m| m.len() > WORKER_LOG_MAX_BYTES)
        .unwrap_or(false);
    if oversized {
        // Concurrent workers share this file; a lost rotation race just
        // means the next opener rotates instead.
        let _ = fs::rename(&log_path, log_dir.join("worker.log.1"));
    }

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open worker log {}", log_path.display()))
}
