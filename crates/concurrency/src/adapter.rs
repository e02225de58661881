//! Version store adapter
//!
//! Translates transaction-core requests into the backend contract:
//!
//! | Core request | Backend call |
//! |--------------|--------------|
//! | stage | `put(key, write_version, value, Provisional)` |
//! | promote | `update_status(key, write_version, Committed { commit_version })` |
//! | purge | `update_status(key, write_version, Aborted)` |
//! | history | `get(key, snapshot)` |
//! | scan | `scan(range, snapshot)` |

use std::sync::Arc;
use tern_core::{
    Cell, CellStatus, CompactionStats, Error, Key, KeyRange, Result, Value, Version,
    VersionedStorage,
};

/// Failure while resolving a write set's provisional cells
///
/// `unsettled` lists the keys whose cells still carry the old status; the
/// failing key is first.
#[derive(Debug)]
pub struct SettleError {
    /// Keys not yet moved to their final status
    pub unsettled: Vec<Key>,
    /// Backend failure that stopped the pass
    pub source: Error,
}

/// Transaction-facing view of a storage backend
pub struct VersionStore<S> {
    backend: Arc<S>,
}

impl<S: VersionedStorage> VersionStore<S> {
    /// Wrap a shared backend
    pub fn new(backend: Arc<S>) -> Self {
        Self { backend }
    }

    /// Underlying backend
    pub fn backend(&self) -> &Arc<S> {
        &self.backend
    }

    /// Write a provisional cell tagged with the writer's version
    pub fn stage(&self, key: &Key, write_version: Version, value: Option<Value>) -> Result<()> {
        tracing::debug!(key = %key, write_version = %write_version, tombstone = value.is_none(), "Staging provisional cell");
        self.backend
            .put(key, write_version, value, CellStatus::Provisional)
    }

    /// Mark every cell of a committed write set as committed
    pub fn promote(
        &self,
        keys: &[Key],
        write_version: Version,
        commit_version: Version,
    ) -> std::result::Result<(), SettleError> {
        self.settle(
            keys,
            write_version,
            CellStatus::Committed { commit_version },
        )
    }

    /// Mark every cell of a rolled-back write set as aborted
    pub fn purge(&self, keys: &[Key], write_version: Version) -> std::result::Result<(), SettleError> {
        self.settle(keys, write_version, CellStatus::Aborted)
    }

    fn settle(
        &self,
        keys: &[Key],
        write_version: Version,
        status: CellStatus,
    ) -> std::result::Result<(), SettleError> {
        for (idx, key) in keys.iter().enumerate() {
            match self.backend.update_status(key, write_version, status) {
                Ok(true) => {}
                Ok(false) => {
                    tracing::warn!(
                        key = %key,
                        write_version = %write_version,
                        ?status,
                        "No provisional cell to settle"
                    );
                }
                Err(source) => {
                    return Err(SettleError {
                        unsettled: keys[idx..].to_vec(),
                        source,
                    });
                }
            }
        }
        tracing::debug!(write_version = %write_version, cells = keys.len(), ?status, "Settled write set");
        Ok(())
    }

    /// History of `key` at or below `snapshot`, newest first
    pub fn history(&self, key: &Key, snapshot: Version) -> Result<Vec<Cell>> {
        self.backend.get(key, snapshot)
    }

    /// Histories of every key in `range` at or below `snapshot`
    pub fn scan(&self, range: &KeyRange, snapshot: Version) -> Result<Vec<(Key, Vec<Cell>)>> {
        self.backend.scan(range, snapshot)
    }

    /// Newest cell of `key` regardless of status
    pub fn latest(&self, key: &Key) -> Result<Option<Cell>> {
        self.backend.latest(key)
    }

    /// Reclaim history below `watermark`
    pub fn compact(&self, watermark: Version) -> Result<CompactionStats> {
        self.backend.compact(watermark)
    }
}

impl<S> std::fmt::Debug for VersionStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionStore").finish_non_exhaustive()
    }
}
