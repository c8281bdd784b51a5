//! Explicit maintenance sweep.

use anyhow::Result;
use console::style;
use pulse_core::PulseCache;

/// Run a full sweep immediately and report what was removed.
///
/// The cache also sweeps opportunistically from its write path; this
/// command exists for operators who want cleanup now.
pub fn run() -> Result<()> {
    let cache = PulseCache::open()?;
    let report = cache.sweep()?;

    println!(
        "{} removed {} record(s), reclaimed {} lock(s)",
        style("✓").green(),
        report.records_removed,
        report.locks_removed
    );

    for error in &report.errors {
        println!("  {} {}", style("!").yellow(), error);
    }

    Ok(())
}
