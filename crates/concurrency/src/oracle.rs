//! Version oracle
//!
//! The oracle is the sole source of ordering truth. Every snapshot version
//! and every commit version comes from [`VersionOracle::next`].
//!
//! # Version Gaps
//!
//! Issued versions are never returned. A version handed to a transaction
//! that later rolls back, or to a commit attempt that fails, is simply
//! skipped: consumers must not assume versions are contiguous.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tern_core::{Error, Result, Version};

/// Source of globally unique, strictly increasing versions
///
/// `next` is fallible so that an implementation backed by a remote
/// sequencing service can report it is unreachable.
pub trait VersionOracle: Send + Sync + fmt::Debug {
    /// Issue a version greater than every version issued before
    fn next(&self) -> Result<Version>;

    /// Most recently issued version
    fn current(&self) -> Version;
}

/// In-process oracle backed by an atomic counter
///
/// # Example
///
/// ```
/// use tern_concurrency::{AtomicOracle, VersionOracle};
/// use tern_core::Version;
///
/// let oracle = AtomicOracle::new(Version::new(10));
/// assert_eq!(oracle.next().unwrap(), Version::new(11));
/// assert_eq!(oracle.current(), Version::new(11));
/// ```
pub struct AtomicOracle {
    /// Last issued version
    version: AtomicU64,
}

impl AtomicOracle {
    /// Create an oracle whose first issued version is `initial + 1`
    ///
    /// # Arguments
    /// * `initial` - Highest version already present (typically the
    ///   backend's highest stored version after a restart)
    pub fn new(initial: Version) -> Self {
        Self {
            version: AtomicU64::new(initial.as_u64()),
        }
    }
}

impl Default for AtomicOracle {
    fn default() -> Self {
        Self::new(Version::ZERO)
    }
}

impl fmt::Debug for AtomicOracle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtomicOracle")
            .field("current", &self.current())
            .finish()
    }
}

impl VersionOracle for AtomicOracle {
    fn next(&self) -> Result<Version> {
        self.version
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| v.checked_add(1))
            .map(|previous| Version::new(previous + 1))
            .map_err(|_| Error::OracleUnavailable("version space exhausted".to_string()))
    }

    fn current(&self) -> Version {
        Version::new(self.version.load(Ordering::SeqCst))
    }
}
