//! Trust evaluation for prompt rendering.
//!
//! Two independent signals feed the prompt: the freshness record (is our
//! picture of the remote recent enough to trust?) and the local ahead/behind
//! counts (straight from git's object database, always trusted). This module
//! combines them into a single display decision.

use crate::error::{PulseError, Result};
use crate::store::FreshnessRecord;
use std::path::Path;
use std::process::Command;

/// Whether a record is fresh: present and younger than the window.
///
/// Pure function of the record and the wall clock -- no I/O, no processes.
/// Absent records (including corrupt ones, which the store reports as
/// absent) are never fresh; a record from the future is not fresh either.
pub fn is_fresh(record: Option<&FreshnessRecord>, window_secs: u64, now: i64) -> bool {
    match record {
        Some(record) => {
            let age = record.age_secs(now);
            age >= 0 && (age as u64) < window_secs
        }
        None => false,
    }
}

/// Local ahead/behind counts relative to the configured upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Divergence {
    /// Commits on the local branch not on the upstream.
    pub ahead: u32,
    /// Commits on the upstream not on the local branch.
    pub behind: u32,
}

impl Divergence {
    /// True when the branch and its upstream point at the same history.
    pub fn in_sync(&self) -> bool {
        self.ahead == 0 && self.behind == 0
    }
}

/// What the prompt should display for a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    /// Zero divergence and a fresh record: safe to claim "synchronized".
    Synced,
    /// Nonzero counts, shown regardless of freshness -- they come from the
    /// local object database, not from the network.
    Diverged {
        /// Commits ahead of upstream.
        ahead: u32,
        /// Commits behind upstream.
        behind: u32,
    },
    /// Show nothing: either there is no upstream to compare against, or the
    /// counts are zero but the record is stale. A stale cache claims
    /// neither "synced" nor "out of sync".
    Silent,
}

/// Decides the display policy from divergence and freshness.
pub fn indicator(divergence: Option<&Divergence>, fresh: bool) -> Indicator {
    match divergence {
        Some(d) if !d.in_sync() => Indicator::Diverged {
            ahead: d.ahead,
            behind: d.behind,
        },
        Some(_) if fresh => Indicator::Synced,
        _ => Indicator::Silent,
    }
}

/// Computes ahead/behind counts for the checked-out branch at `root`.
///
/// Returns `Ok(None)` when there is no upstream to compare against (new
/// branch, detached HEAD, no remotes). This is the one git invocation the
/// status path makes; it reads only the local object database.
pub fn upstream_divergence(root: &Path) -> Result<Option<Divergence>> {
    let output = Command::new("git")
        .args(["rev-list", "--left-right", "--count", "@{upstream}...HEAD"])
        .current_dir(root)
        .output()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PulseError::GitNotFound
            } else {
                PulseError::Io(e)
            }
        })?;

    if !output.status.success() {
        // No upstream configured (or detached HEAD): nothing to compare.
        return Ok(None);
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(parse_left_right(&stdout))
}

/// Parses `git rev-list --left-right --count` output: "<behind>\t<ahead>".
///
/// With `@{upstream}...HEAD`, the left count is commits only on the
/// upstream (behind) and the right count is commits only on HEAD (ahead).
fn parse_left_right(s: &str) -> Option<Divergence> {
    let mut parts = s.split_whitespace();
    let behind = parts.next()?.parse::<u32>().ok()?;
    let ahead = parts.next()?.parse::<u32>().ok()?;
    Some(Divergence { ahead, behind })
}
