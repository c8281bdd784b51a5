//! Forget the cached record for one repository.

use anyhow::Result;
use console::style;
use pulse_core::PulseCache;

/// Remove the freshness record and any lock for the current repository.
pub fn run() -> Result<()> {
    let cache = PulseCache::open()?;
    let cwd = std::env::current_dir()?;

    if cache.reset(&cwd)? {
        println!("{} record forgotten", style("✓").green());
    } else {
        println!("{} not inside a git repository", style("!").yellow());
    }

    Ok(())
}
