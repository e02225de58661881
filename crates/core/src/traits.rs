//! Storage backend contract
//!
//! The transaction core never owns data. It drives a backend that maps keys
//! to ordered sequences of versioned cells. Durability and replication are
//! the backend's business.

use crate::cell::{Cell, CellStatus, CompactionStats};
use crate::error::Result;
use crate::types::{Key, KeyRange, Version};
use crate::value::Value;

/// Multi-versioned key-value storage
///
/// Implementations must be safe to call from many threads at once. Each
/// method is a potential suspension point: on failure it returns
/// [`Error::StorageUnavailable`](crate::Error::StorageUnavailable) and must
/// not have applied a partial change to the addressed cell.
pub trait VersionedStorage: Send + Sync {
    /// Cells of `key` with version `<= max_version`, newest first
    fn get(&self, key: &Key, max_version: Version) -> Result<Vec<Cell>>;

    /// Cells of every key in `range` with version `<= max_version`
    ///
    /// Keys ascend; each key's cells are newest first. Keys with no cell at
    /// or below `max_version` are omitted.
    fn scan(&self, range: &KeyRange, max_version: Version) -> Result<Vec<(Key, Vec<Cell>)>>;

    /// Write one cell, replacing any cell already at `(key, version)`
    fn put(
        &self,
        key: &Key,
        version: Version,
        value: Option<Value>,
        status: CellStatus,
    ) -> Result<()>;

    /// Change the status of the cell at `(key, version)`
    ///
    /// Returns `Ok(false)` when no such cell exists.
    fn update_status(&self, key: &Key, version: Version, status: CellStatus) -> Result<bool>;

    /// Newest cell of `key` regardless of status
    fn latest(&self, key: &Key) -> Result<Option<Cell>>;

    /// Reclaim history no live transaction can observe
    ///
    /// Drops aborted cells, provisional cells below `watermark`, and for
    /// each key every committed cell shadowed by a newer committed cell
    /// whose commit version is `<= watermark`.
    fn compact(&self, watermark: Version) -> Result<CompactionStats>;
}
