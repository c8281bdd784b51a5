//! Pulse CLI - shell hooks for the git-fetch freshness cache.
//!
//! The shell integration calls `pulse sync` from its startup, chdir, and
//! pre-command hooks, and `pulse status` from the prompt renderer. Both are
//! hot paths: `sync` does one record read inline and pushes any real work
//! into a detached worker process; `status` prints at most one short line.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "pulse")]
#[command(about = "Smart git-fetch freshness cache for shell prompts", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync the current repository in the background if its record is stale
    Sync {
        /// Which shell hook fired (for logging only)
        #[arg(long, default_value = "manual")]
        event: String,
        /// Run the fetch in the foreground instead of detaching
        #[arg(long)]
        foreground: bool,
    },
    /// Print the prompt indicator for the current repository
    Status {
        /// Output format (text, json)
        #[arg(long, default_value = "text")]
        format: String,
        /// Also print freshness details (not for prompt use)
        #[arg(short, long)]
        verbose: bool,
    },
    /// Record that a manual pull/fetch just succeeded
    Mark,
    /// Remove records idle past the retention window and abandoned locks
    Sweep,
    /// Forget the cached record for the current repository
    Reset,
    /// Internal: run one sync attempt for a repository root
    #[command(hide = true)]
    Worker {
        /// Repository root to synchronize
        root: std::path::PathBuf,
    },
}

fn main() -> Result<()> {
    // Initialize tracing subscriber
    // Respects RUST_LOG environment variable (e.g., RUST_LOG=debug)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Sync { event, foreground } => commands::sync::run(&event, foreground),
        Commands::Status { format, verbose } => commands::status::run(&format, verbose),
        Commands::Mark => commands::mark::run(),
        Commands::Sweep => commands::sweep::run(),
        Commands::Reset => commands::reset::run(),
        Commands::Worker { root } => commands::sync::run_worker(&root),
    }
}
