//! Table-scoped handle.
//!
//! A [`Table`] fixes the table name so callers address rows directly.
//!
//! # Example
//!
//! ```
//! use terndb::prelude::*;
//!
//! let db = Tern::ephemeral()?;
//! let users = db.table("users");
//!
//! let txn = db.begin()?;
//! users.put(&txn, "alice", "admin")?;
//! users.put(&txn, "bob", "viewer")?;
//! db.commit(&txn)?;
//!
//! let reader = db.begin()?;
//! assert_eq!(users.scan_prefix(&reader, "")?.len(), 2);
//! # Ok::<(), terndb::Error>(())
//! ```

use crate::error::Result;
use std::sync::Arc;
use tern_concurrency::{Transaction, TransactionManager};
use tern_core::{Cell, Key, KeyRange, Value, VersionedStorage};
use tern_storage::MemoryStore;

/// Operations on one table.
///
/// Access via `db.table(name)`.
pub struct Table<S = MemoryStore> {
    name: String,
    manager: Arc<TransactionManager<S>>,
}

impl<S: VersionedStorage> Table<S> {
    pub(crate) fn new(name: String, manager: Arc<TransactionManager<S>>) -> Self {
        Self { name, manager }
    }

    /// Table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn key(&self, row: impl AsRef<[u8]>) -> Key {
        Key::new(self.name.as_str(), row)
    }

    /// Write `value` at `row`.
    pub fn put(&self, txn: &Transaction, row: impl AsRef<[u8]>, value: impl Into<Value>) -> Result<()> {
        Ok(self.manager.put(txn, self.key(row), value)?)
    }

    /// Read `row` as seen by `txn`.
    pub fn get(&self, txn: &Transaction, row: impl AsRef<[u8]>) -> Result<Option<Value>> {
        Ok(self.manager.get(txn, &self.key(row))?)
    }

    /// Delete `row`.
    pub fn delete(&self, txn: &Transaction, row: impl AsRef<[u8]>) -> Result<()> {
        Ok(self.manager.delete(txn, self.key(row))?)
    }

    /// Visible rows starting with `prefix`, ascending.
    pub fn scan_prefix(
        &self,
        txn: &Transaction,
        prefix: impl AsRef<[u8]>,
    ) -> Result<Vec<(Key, Value)>> {
        let range = KeyRange::prefix(self.name.as_str(), prefix);
        Ok(self.manager.scan(txn, &range)?)
    }

    /// Raw newest cell of `row`, outside any transaction.
    ///
    /// Like reading the backing table directly: provisional and aborted
    /// cells are returned as stored.
    pub fn read_latest(&self, row: impl AsRef<[u8]>) -> Result<Option<Cell>> {
        Ok(self.manager.read_latest(&self.key(row))?)
    }
}

impl<S> Clone for Table<S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            manager: Arc::clone(&self.manager),
        }
    }
}

impl<S> std::fmt::Debug for Table<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table").field("name", &self.name).finish()
    }
}
