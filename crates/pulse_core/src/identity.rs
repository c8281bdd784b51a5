//! Repository identity: mapping working directories to stable cache keys.

use crate::error::{PulseError, Result};
use std::fmt;
use std::path::{Path, PathBuf};

/// A 32-byte BLAKE3 hash of a repository's canonical top-level path.
///
/// Identities key everything the cache persists. The same repository root
/// always produces the same identity on a given machine; distinct roots
/// produce distinct identities with overwhelming probability. The identity
/// is derived, never stored: recomputing it is cheap enough for every
/// prompt render.
///
/// # Examples
///
/// ```
/// use pulse_core::RepoIdentity;
/// use std::path::Path;
///
/// let a = RepoIdentity::for_root(Path::new("/home/me/proj"));
/// let b = RepoIdentity::for_root(Path::new("/home/me/proj"));
/// assert_eq!(a, b);
/// assert_eq!(a.as_hex().len(), 64);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RepoIdentity([u8; 32]);

impl RepoIdentity {
    /// The length of an identity as a hex string.
    pub const HEX_LEN: usize = 64;

    /// Creates an identity from raw bytes.
    #[inline]
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Computes the identity for a repository root path.
    ///
    /// The path should be the canonical top-level working-tree directory as
    /// returned by [`discover_root`]; hashing a non-canonical alias of the
    /// same root yields a different identity.
    pub fn for_root(root: &Path) -> Self {
        let hash = blake3::hash(root.as_os_str().as_encoded_bytes());
        Self(*hash.as_bytes())
    }

    /// Returns this identity as a lowercase hex string.
    ///
    /// The returned string is always exactly 64 characters long and is the
    /// file name used for the on-disk freshness record.
    pub fn as_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses an identity from a hex string.
    ///
    /// # Errors
    ///
    /// Returns `PulseError::InvalidHex` if the string is not valid hex
    /// or is not exactly 64 characters long.
    pub fn from_hex(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.len() != Self::HEX_LEN {
            return Err(PulseError::InvalidHex(format!(
                "expected {} hex chars, got {}",
                Self::HEX_LEN,
                s.len()
            )));
        }

        let bytes = hex::decode(s).map_err(|e| PulseError::InvalidHex(e.to_string()))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| PulseError::InvalidHex("invalid length".to_string()))?;

        Ok(Self(arr))
    }
}

impl fmt::Display for RepoIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_hex())
    }
}

impl fmt::Debug for RepoIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RepoIdentity({}...)", &self.as_hex()[..12])
    }
}

/// Finds the top-level working-tree root containing `dir`.
///
/// Walks `dir` and its ancestors looking for a `.git` entry. A `.git`
/// directory marks an ordinary working tree; a `.git` file marks a linked
/// worktree or submodule, which counts the same way. The returned path is
/// canonicalized, so every path inside one working tree resolves to the
/// same root (and therefore the same [`RepoIdentity`]).
///
/// Returns `Ok(None)` when `dir` is not inside any working tree, or when it
/// does not exist. "Not a repository" is a no-op signal for callers, never
/// an error surfaced to the user.
pub fn discover_root(dir: &Path) -> Result<Option<PathBuf>> {
    let start = match dir.canonicalize() {
        Ok(p) => p,
        // Nonexistent or unreadable directory: nothing to do here.
        Err(_) => return Ok(None),
    };

    let mut current: &Path = &start;
    loop {
        if current.join(".git").exists() {
            return Ok(Some(current.to_path_buf()));
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return Ok(None),
        }
    }
}

/// Resolves a working directory to its repository identity.
///
/// Convenience wrapper combining [`discover_root`] and
/// [`RepoIdentity::for_root`]. Returns `Ok(None)` outside any working tree.
pub fn resolve(dir: &Path) -> Result<Option<(RepoIdentity, PathBuf)>> {
    Ok(discover_root(dir)?.map(|root| (RepoIdentity::for_root(&root), root)))
}
