//! Unified error type for tern.
//!
//! This module provides the error type returned by the public API. It
//! wraps the transaction core's errors and adds configuration and I/O
//! failures from the facade.

use thiserror::Error;
use tern_core::{Key, Version};

/// All tern errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Operation attempted on a transaction in the wrong state.
    #[error("invalid transaction state: {0}")]
    InvalidState(String),

    /// Commit detected a write-write conflict; the transaction was rolled back.
    #[error("transaction {txn} rolled back: {key} was committed at {committed_at} by a concurrent transaction")]
    Rollback {
        /// Id of the rolled-back transaction.
        txn: Version,
        /// First conflicting key.
        key: Key,
        /// Commit version of the conflicting write.
        committed_at: Version,
    },

    /// Storage backend failed or timed out; the operation had no effect.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Version oracle could not issue a version; the operation had no effect.
    #[error("version oracle unavailable: {0}")]
    OracleUnavailable(String),

    /// Invalid or unreadable configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for tern operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error is retryable.
    ///
    /// A rollback may succeed with a fresh transaction; an unavailable
    /// backend or oracle left the transaction unchanged, so the same call
    /// may be repeated.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Rollback { .. } | Error::StorageUnavailable(_) | Error::OracleUnavailable(_)
        )
    }

    /// Check if this is a commit-time conflict.
    pub fn is_rollback(&self) -> bool {
        matches!(self, Error::Rollback { .. })
    }

    /// Check if this is an invalid-state error.
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Error::InvalidState(_))
    }
}

// Convert from transaction core errors
impl From<tern_core::Error> for Error {
    fn from(e: tern_core::Error) -> Self {
        use tern_core::Error as CoreError;
        match e {
            CoreError::InvalidState(msg) => Error::InvalidState(msg),
            CoreError::Rollback {
                txn,
                key,
                committed_at,
            } => Error::Rollback {
                txn,
                key,
                committed_at,
            },
            CoreError::StorageUnavailable(msg) => Error::StorageUnavailable(msg),
            CoreError::OracleUnavailable(msg) => Error::OracleUnavailable(msg),
        }
    }
}

// Convert from TOML errors
impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(e: toml::ser::Error) -> Self {
        Error::Config(e.to_string())
    }
}
