//! Manual sync marker: the user already pulled or fetched.

use anyhow::Result;
use console::style;
use pulse_core::PulseCache;

/// Record a completed manual sync for the current repository.
///
/// Wired into shell aliases or wrappers around `git pull` / `git fetch`:
/// the sync already happened, so the record advances directly, without the
/// lock-and-attempt machinery.
pub fn run() -> Result<()> {
    let cache = PulseCache::open()?;
    let cwd = std::env::current_dir()?;

    if cache.mark_synced(&cwd)? {
        println!("{} marked synced", style("✓").green());
    } else {
        println!("{} not inside a git repository", style("!").yellow());
    }

    Ok(())
}
