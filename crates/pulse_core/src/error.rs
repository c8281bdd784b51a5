//! Error types for pulse_core operations.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for pulse_core operations.
#[derive(Error, Debug)]
pub enum PulseError {
    /// Invalid hex string for RepoIdentity parsing.
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    /// A freshness record file exists but cannot be parsed.
    ///
    /// Callers on the read path never see this error: `FreshnessStore::read`
    /// maps it to "no record", which downstream means "stale".
    #[error("invalid freshness record at {}: {}", path.display(), reason)]
    InvalidRecord {
        /// Path to the malformed record file
        path: PathBuf,
        /// Description of what's invalid
        reason: String,
    },

    /// No per-user cache directory could be resolved on this platform.
    #[error("no cache directory available (set PULSE_DIR to override)")]
    NoCacheDir,

    /// git exited with a non-zero status.
    #[error("git fetch failed (exit {status}): {stderr}")]
    GitFailed {
        /// Exit code reported by git (-1 when killed by a signal)
        status: i32,
        /// Trailing stderr output from git
        stderr: String,
    },

    /// git did not finish within the configured timeout and was killed.
    #[error("git fetch timed out after {secs}s")]
    GitTimeout {
        /// Configured timeout in seconds
        secs: u64,
    },

    /// The git binary could not be spawned at all.
    #[error("git not found. Ensure git is installed and on PATH.")]
    GitNotFound,

    /// Configuration error (loading, parsing, invalid values).
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PulseError {
    /// Returns a user-friendly recovery suggestion for the error, if available.
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            Self::NoCacheDir => {
                Some("Set PULSE_DIR to a writable directory, e.g. PULSE_DIR=~/.cache/pulse.")
            }
            Self::GitTimeout { .. } => {
                Some("The remote may be slow or unreachable. The next trigger will retry.")
            }
            Self::GitNotFound => Some("Install git, or remove the pulse hooks from your shell."),
            Self::InvalidRecord { .. } => {
                Some("Run 'pulse sweep' to clean up malformed cache entries.")
            }
            _ => None,
        }
    }
}

/// Convenience Result type for pulse_core operations.
pub type Result<T> = std::result::Result<T, PulseError>;
