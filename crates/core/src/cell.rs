//! Versioned cells
//!
//! A key's history in the store is an ordered sequence of cells, one per
//! write version. Cells move through a small lifecycle:
//!
//! ```text
//! Provisional ──promote──> Committed { commit_version }
//!      │
//!      └──────purge──────> Aborted
//! ```

use crate::types::Version;
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// Commit state of a cell as recorded by the storage backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellStatus {
    /// Written by a transaction that has not finished yet
    Provisional,
    /// Promoted after the owning transaction committed
    Committed {
        /// Version the owning transaction committed at
        commit_version: Version,
    },
    /// Owning transaction rolled back; never visible
    Aborted,
}

impl CellStatus {
    /// Check for the provisional state
    pub fn is_provisional(&self) -> bool {
        matches!(self, CellStatus::Provisional)
    }

    /// Commit version, if committed
    pub fn commit_version(&self) -> Option<Version> {
        match self {
            CellStatus::Committed { commit_version } => Some(*commit_version),
            _ => None,
        }
    }
}

/// One entry in a key's version history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    /// Write version (the writer's snapshot version)
    pub version: Version,
    /// Payload; `None` is a tombstone left by a delete
    pub value: Option<Value>,
    /// Commit state
    pub status: CellStatus,
}

impl Cell {
    /// Create a cell
    pub fn new(version: Version, value: Option<Value>, status: CellStatus) -> Self {
        Self {
            version,
            value,
            status,
        }
    }

    /// Check whether this cell is a tombstone
    pub fn is_tombstone(&self) -> bool {
        self.value.is_none()
    }
}

/// What a storage compaction pass removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactionStats {
    /// Aborted cells dropped
    pub aborted_removed: usize,
    /// Abandoned provisional cells dropped
    pub provisional_removed: usize,
    /// Committed cells shadowed by a newer committed cell below the watermark
    pub shadowed_removed: usize,
    /// Keys whose history became empty and were removed
    pub keys_removed: usize,
}

impl CompactionStats {
    /// Total cells removed
    pub fn cells_removed(&self) -> usize {
        self.aborted_removed + self.provisional_removed + self.shadowed_removed
    }
}
