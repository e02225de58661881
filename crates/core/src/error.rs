//! Error types for the transaction core
//!
//! Every failure path surfaces one of these variants; nothing is logged
//! and swallowed.
//!
//! | Variant | Meaning | Retry |
//! |---------|---------|-------|
//! | InvalidState | Operation on a transaction in the wrong state | Never (caller bug) |
//! | Rollback | Write-write conflict detected at commit | With a fresh transaction |
//! | StorageUnavailable | Backend call failed or timed out | Same operation, state unchanged |
//! | OracleUnavailable | Version oracle could not issue a version | Same operation, state unchanged |

use crate::types::{Key, Version};
use thiserror::Error;

/// Transaction core errors
#[derive(Debug, Error)]
pub enum Error {
    /// Operation attempted on a transaction not in the required state
    #[error("invalid transaction state: {0}")]
    InvalidState(String),

    /// Commit detected a write-write conflict; the transaction was rolled back
    #[error("transaction {txn} rolled back: {key} was committed at {committed_at} by a concurrent transaction")]
    Rollback {
        /// Snapshot version (id) of the aborted transaction
        txn: Version,
        /// First conflicting key found
        key: Key,
        /// Commit version of the conflicting write
        committed_at: Version,
    },

    /// Storage backend call failed or timed out
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Version oracle could not issue a version
    #[error("version oracle unavailable: {0}")]
    OracleUnavailable(String),
}

/// Result type for transaction core operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this is a commit-time conflict
    pub fn is_rollback(&self) -> bool {
        matches!(self, Error::Rollback { .. })
    }

    /// Check if this is an invalid-state error
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Error::InvalidState(_))
    }

    /// Check if the backend or oracle was unreachable
    ///
    /// Operations failing this way leave the transaction unchanged, so the
    /// same call may be retried.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Error::StorageUnavailable(_) | Error::OracleUnavailable(_)
        )
    }
}
