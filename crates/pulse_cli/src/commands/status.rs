//! Prompt indicator output.

use anyhow::Result;
use chrono::DateTime;
use console::style;
use pulse_core::{Indicator, PulseCache};

/// Print the indicator for the repository containing the current directory.
///
/// This is called from the prompt renderer on every redraw, so it must not
/// fail and must not block: a problem of any kind prints nothing, which the
/// prompt treats as "no claim either way".
pub fn run(format: &str, verbose: bool) -> Result<()> {
    let Ok(cache) = PulseCache::open() else {
        return Ok(());
    };
    let Ok(cwd) = std::env::current_dir() else {
        return Ok(());
    };

    let indicator = cache.status(&cwd);

    match format {
        "json" => print_json(&indicator),
        _ => print_text(&indicator),
    }

    if verbose {
        print_freshness_details(&cache, &cwd);
    }

    Ok(())
}

fn print_text(indicator: &Indicator) {
    match indicator {
        Indicator::Synced => println!("{}", style("✓").green()),
        Indicator::Diverged { ahead, behind } => {
            let mut parts = Vec::new();
            if *ahead > 0 {
                parts.push(format!("⇡{}", ahead));
            }
            if *behind > 0 {
                parts.push(format!("⇣{}", behind));
            }
            println!("{}", style(parts.join(" ")).yellow());
        }
        Indicator::Silent => {}
    }
}

fn print_json(indicator: &Indicator) {
    let value = match indicator {
        Indicator::Synced => serde_json::json!({ "state": "synced" }),
        Indicator::Diverged { ahead, behind } => serde_json::json!({
            "state": "diverged",
            "ahead": ahead,
            "behind": behind,
        }),
        Indicator::Silent => serde_json::json!({ "state": "silent" }),
    };
    println!("{}", value);
}

fn print_freshness_details(cache: &PulseCache, cwd: &std::path::Path) {
    match cache.last_sync(cwd) {
        Ok(Some(epoch)) => {
            let when = DateTime::from_timestamp(epoch, 0)
                .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| epoch.to_string());
            eprintln!("last sync: {}", when);
        }
        Ok(None) => eprintln!("last sync: never"),
        Err(_) => {}
    }
}
