//! In-memory multi-version store
//!
//! Replaces an external versioned table store for embedded use and tests.
//!
//! # Design
//!
//! - DashMap: one shard per table, tables never contend
//! - BTreeMap of rows inside a shard: ordered range scans
//! - BTreeMap of versions per row: newest-first reads via reverse range
//!
//! Every call touches exactly one shard, so a single-cell write is atomic
//! with respect to readers of the same table.

use dashmap::DashMap;
use std::collections::BTreeMap;
use std::ops::Bound;
use tern_core::{
    Cell, CellStatus, CompactionStats, Key, KeyRange, Result, Value, Version, VersionedStorage,
};

/// Cell payload and status stored under one version
#[derive(Debug, Clone)]
struct StoredCell {
    value: Option<Value>,
    status: CellStatus,
}

type VersionChain = BTreeMap<Version, StoredCell>;

/// Per-table shard containing the table's rows
#[derive(Debug, Default)]
pub struct Shard {
    rows: BTreeMap<Vec<u8>, VersionChain>,
}

impl Shard {
    /// Create a new empty shard
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows with at least one cell
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if shard is empty
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn cell_count(&self) -> usize {
        self.rows.values().map(|chain| chain.len()).sum()
    }
}

/// Collect cells at or below `max_version`, newest first
fn visible_prefix(chain: &VersionChain, max_version: Version) -> Vec<Cell> {
    chain
        .range(..=max_version)
        .rev()
        .map(|(version, stored)| Cell::new(*version, stored.value.clone(), stored.status))
        .collect()
}

/// Sharded in-memory store - DashMap by table, BTreeMap within
///
/// # Thread Safety
///
/// All operations are thread-safe:
/// - reads take the table's shard read guard
/// - writes only lock the target table's shard
/// - different tables never contend
///
/// # Example
///
/// ```
/// use tern_core::{CellStatus, Key, Value, Version, VersionedStorage};
/// use tern_storage::MemoryStore;
///
/// let store = MemoryStore::new();
/// let key = Key::new("test", "row");
/// store.put(&key, Version::new(1), Some(Value::from("a")), CellStatus::Provisional).unwrap();
/// assert_eq!(store.get(&key, Version::new(1)).unwrap().len(), 1);
/// assert!(store.get(&key, Version::ZERO).unwrap().is_empty());
/// ```
pub struct MemoryStore {
    shards: DashMap<String, Shard>,
}

impl MemoryStore {
    /// Create new empty store
    pub fn new() -> Self {
        Self {
            shards: DashMap::new(),
        }
    }

    /// Create with expected number of tables
    pub fn with_capacity(num_tables: usize) -> Self {
        Self {
            shards: DashMap::with_capacity(num_tables),
        }
    }

    /// Number of tables holding data
    pub fn table_count(&self) -> usize {
        self.shards.len()
    }

    /// Total number of cells across all tables
    pub fn total_cells(&self) -> usize {
        self.shards.iter().map(|entry| entry.value().cell_count()).sum()
    }

    /// Number of cells stored for one key
    pub fn cell_count(&self, key: &Key) -> usize {
        self.shards
            .get(&key.table)
            .and_then(|shard| shard.rows.get(&key.row).map(|chain| chain.len()))
            .unwrap_or(0)
    }

    /// Highest write version present in the store
    ///
    /// Used to seed a version oracle above existing data.
    pub fn max_version(&self) -> Version {
        self.shards
            .iter()
            .filter_map(|entry| {
                let newest = entry
                    .value()
                    .rows
                    .values()
                    .flat_map(|chain| chain.iter())
                    .map(|(version, stored)| {
                        stored.status.commit_version().unwrap_or(*version).max(*version)
                    })
                    .max();
                newest
            })
            .max()
            .unwrap_or(Version::ZERO)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("table_count", &self.table_count())
            .field("total_cells", &self.total_cells())
            .finish()
    }
}

impl VersionedStorage for MemoryStore {
    fn get(&self, key: &Key, max_version: Version) -> Result<Vec<Cell>> {
        Ok(self
            .shards
            .get(&key.table)
            .and_then(|shard| {
                shard
                    .rows
                    .get(&key.row)
                    .map(|chain| visible_prefix(chain, max_version))
            })
            .unwrap_or_default())
    }

    fn scan(&self, range: &KeyRange, max_version: Version) -> Result<Vec<(Key, Vec<Cell>)>> {
        let shard = match self.shards.get(&range.table) {
            Some(shard) => shard,
            None => return Ok(Vec::new()),
        };
        let upper = match &range.end {
            Some(end) => Bound::Excluded(end.clone()),
            None => Bound::Unbounded,
        };
        let results = shard
            .rows
            .range((Bound::Included(range.start.clone()), upper))
            .filter_map(|(row, chain)| {
                let cells = visible_prefix(chain, max_version);
                if cells.is_empty() {
                    None
                } else {
                    Some((Key::new(range.table.clone(), row), cells))
                }
            })
            .collect();
        Ok(results)
    }

    fn put(
        &self,
        key: &Key,
        version: Version,
        value: Option<Value>,
        status: CellStatus,
    ) -> Result<()> {
        self.shards
            .entry(key.table.clone())
            .or_insert_with(Shard::new)
            .rows
            .entry(key.row.clone())
            .or_default()
            .insert(version, StoredCell { value, status });
        Ok(())
    }

    fn update_status(&self, key: &Key, version: Version, status: CellStatus) -> Result<bool> {
        let mut shard = match self.shards.get_mut(&key.table) {
            Some(shard) => shard,
            None => return Ok(false),
        };
        match shard
            .rows
            .get_mut(&key.row)
            .and_then(|chain| chain.get_mut(&version))
        {
            Some(stored) => {
                stored.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn latest(&self, key: &Key) -> Result<Option<Cell>> {
        Ok(self.shards.get(&key.table).and_then(|shard| {
            shard.rows.get(&key.row).and_then(|chain| {
                chain
                    .iter()
                    .next_back()
                    .map(|(version, stored)| Cell::new(*version, stored.value.clone(), stored.status))
            })
        }))
    }

    fn compact(&self, watermark: Version) -> Result<CompactionStats> {
        let mut stats = CompactionStats::default();

        for mut shard in self.shards.iter_mut() {
            shard.rows.retain(|_, chain| {
                compact_chain(chain, watermark, &mut stats);
                if chain.is_empty() {
                    stats.keys_removed += 1;
                    false
                } else {
                    true
                }
            });
        }
        self.shards.retain(|_, shard| !shard.is_empty());

        if stats.cells_removed() > 0 {
            tracing::debug!(
                watermark = %watermark,
                aborted = stats.aborted_removed,
                provisional = stats.provisional_removed,
                shadowed = stats.shadowed_removed,
                "Compacted memory store"
            );
        }
        Ok(stats)
    }
}

/// Compact one key's history in place
fn compact_chain(chain: &mut VersionChain, watermark: Version, stats: &mut CompactionStats) {
    // Newest committed cell every snapshot at or above the watermark can still see
    let anchor = chain
        .iter()
        .filter_map(|(version, stored)| {
            stored
                .status
                .commit_version()
                .filter(|commit| *commit <= watermark)
                .map(|commit| (commit, *version))
        })
        .max()
        .map(|(_, version)| version);

    chain.retain(|version, stored| match stored.status {
        CellStatus::Aborted => {
            stats.aborted_removed += 1;
            false
        }
        CellStatus::Provisional if *version < watermark => {
            stats.provisional_removed += 1;
            false
        }
        CellStatus::Provisional => true,
        CellStatus::Committed { commit_version } => {
            if commit_version <= watermark && Some(*version) != anchor {
                stats.shadowed_removed += 1;
                false
            } else {
                true
            }
        }
    });
}
