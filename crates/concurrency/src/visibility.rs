//! Visibility resolver
//!
//! Decides which value a transaction reading at `snapshot` observes for a
//! key. A cell is visible iff its commit version is at or below the
//! snapshot. The commit version comes from the cell itself once promoted,
//! otherwise from the commit table entry for its write version.
//!
//! Cells with an aborted or missing entry are never visible, and cells
//! written above the snapshot cannot have committed at or below it, so the
//! resolver only reads history at or below the snapshot.
//!
//! First-committer-wins keeps committed cells of one key in the same order
//! by write version and by commit version, so the newest visible cell is
//! the first match walking history newest-first.

use std::collections::BTreeMap;
use tern_core::{Cell, CellStatus, Key, KeyRange, Result, Value, Version, VersionedStorage};

use crate::adapter::VersionStore;
use crate::commit_table::{CommitOutcome, CommitTable};

/// Buffered writes of one transaction; `None` is a delete
pub type WriteSet = BTreeMap<Key, Option<Value>>;

enum Effective {
    Committed(Version),
    Invisible,
    /// Provisional, entry compacted away; storage may since have settled it
    Unknown,
}

enum Pick {
    Visible(usize),
    Hidden,
    Recheck,
}

/// Snapshot reads over a version store and commit table
pub struct VisibilityResolver<'a, S> {
    store: &'a VersionStore<S>,
    commits: &'a CommitTable,
}

impl<'a, S: VersionedStorage> VisibilityResolver<'a, S> {
    /// Create a resolver borrowing the store and commit table
    pub fn new(store: &'a VersionStore<S>, commits: &'a CommitTable) -> Self {
        Self { store, commits }
    }

    /// Value of `key` visible at `snapshot`
    ///
    /// `overlay` is the reader's own write set and takes priority over
    /// storage. Returns `None` for absent keys and for tombstones.
    pub fn resolve(
        &self,
        key: &Key,
        snapshot: Version,
        overlay: Option<&WriteSet>,
    ) -> Result<Option<Value>> {
        if let Some(buffered) = overlay.and_then(|writes| writes.get(key)) {
            return Ok(buffered.clone());
        }
        let cells = self.store.history(key, snapshot)?;
        self.resolve_cells(key, cells, snapshot)
    }

    /// Every visible `(key, value)` in `range`, ascending by key
    pub fn resolve_range(
        &self,
        range: &KeyRange,
        snapshot: Version,
        overlay: Option<&WriteSet>,
    ) -> Result<Vec<(Key, Value)>> {
        let mut visible = BTreeMap::new();
        for (key, cells) in self.store.scan(range, snapshot)? {
            if let Some(value) = self.resolve_cells(&key, cells, snapshot)? {
                visible.insert(key, value);
            }
        }

        if let Some(writes) = overlay {
            for (key, buffered) in writes.iter().filter(|(key, _)| range.contains(key)) {
                match buffered {
                    Some(value) => {
                        visible.insert(key.clone(), value.clone());
                    }
                    None => {
                        visible.remove(key);
                    }
                }
            }
        }

        Ok(visible.into_iter().collect())
    }

    fn resolve_cells(&self, key: &Key, cells: Vec<Cell>, snapshot: Version) -> Result<Option<Value>> {
        let (cells, pick) = match self.pick(&cells, snapshot, true) {
            Pick::Recheck => {
                tracing::debug!(key = %key, snapshot = %snapshot, "Provisional cell below commit table floor, re-reading");
                let fresh = self.store.history(key, snapshot)?;
                let pick = self.pick(&fresh, snapshot, false);
                (fresh, pick)
            }
            pick => (cells, pick),
        };

        match pick {
            Pick::Visible(idx) => Ok(cells.into_iter().nth(idx).and_then(|cell| cell.value)),
            Pick::Hidden | Pick::Recheck => Ok(None),
        }
    }

    fn pick(&self, cells: &[Cell], snapshot: Version, allow_recheck: bool) -> Pick {
        for (idx, cell) in cells.iter().enumerate() {
            match self.effective(cell, snapshot) {
                Effective::Committed(commit_version) if commit_version <= snapshot => {
                    return Pick::Visible(idx)
                }
                Effective::Unknown if allow_recheck => return Pick::Recheck,
                _ => {}
            }
        }
        Pick::Hidden
    }

    fn effective(&self, cell: &Cell, snapshot: Version) -> Effective {
        match cell.status {
            CellStatus::Committed { commit_version } => Effective::Committed(commit_version),
            CellStatus::Aborted => Effective::Invisible,
            // The floor is read after the lookup: compaction raises it
            // before dropping entries.
            CellStatus::Provisional => match self.commits.wait_decided(cell.version, snapshot) {
                Some(CommitOutcome::Committed(commit_version)) => {
                    Effective::Committed(commit_version)
                }
                Some(_) => Effective::Invisible,
                None if cell.version < self.commits.floor() => Effective::Unknown,
                None => Effective::Invisible,
            },
        }
    }
}
