//! Main database entry point for tern.
//!
//! This module provides the `Tern` struct, the handle through which
//! transactions are begun, read, written, committed and rolled back.

use crate::config::TernConfig;
use crate::error::Result;
use crate::table::Table;
use std::sync::Arc;
use tern_concurrency::{
    AtomicOracle, CompactionReport, ManagerConfig, MetricsSnapshot, Transaction,
    TransactionManager, VersionOracle,
};
use tern_core::{Cell, Key, KeyRange, Value, Version, VersionedStorage};
use tern_storage::MemoryStore;

/// The tern database.
///
/// Cloning is cheap; clones share the same transaction manager and
/// backend, so a handle can be passed to each worker thread.
///
/// # Example
///
/// ```
/// use terndb::prelude::*;
///
/// let db = Tern::ephemeral()?;
/// let key = Key::new("accounts", "alice");
///
/// let txn = db.begin()?;
/// db.put(&txn, key.clone(), "100")?;
/// db.commit(&txn)?;
///
/// let reader = db.begin()?;
/// assert_eq!(db.get(&reader, &key)?, Some(Value::from("100")));
/// # Ok::<(), terndb::Error>(())
/// ```
pub struct Tern<S = MemoryStore> {
    inner: Arc<TransactionManager<S>>,
    config: TernConfig,
}

impl Tern<MemoryStore> {
    /// Create an in-memory database with default settings.
    ///
    /// All data is lost when the last handle is dropped.
    pub fn ephemeral() -> Result<Self> {
        Self::builder().open()
    }

    /// Reopen over an already populated in-memory store.
    ///
    /// The oracle resumes above both the configured initial version and
    /// the highest version present in the store, so new snapshots order
    /// after every existing cell.
    pub fn resume(store: MemoryStore, mut config: TernConfig) -> Result<Self> {
        let highest = store.max_version().as_u64();
        if highest > config.oracle.initial_version {
            tracing::debug!(highest, configured = config.oracle.initial_version, "Resuming oracle above stored versions");
            config.oracle.initial_version = highest;
        }
        Self::open_with(store, config)
    }

    /// Create a builder for database configuration.
    ///
    /// # Example
    ///
    /// ```
    /// use terndb::Tern;
    ///
    /// let db = Tern::builder()
    ///     .initial_version(1_000)
    ///     .auto_compact_every(64)
    ///     .open()?;
    /// assert_eq!(db.current_version().as_u64(), 1_000);
    /// # Ok::<(), terndb::Error>(())
    /// ```
    pub fn builder() -> TernBuilder {
        TernBuilder::new()
    }
}

impl<S: VersionedStorage> Tern<S> {
    /// Open a database over the given backend.
    pub fn open_with(store: S, config: TernConfig) -> Result<Self> {
        let oracle = Arc::new(AtomicOracle::new(Version::new(
            config.oracle.initial_version,
        )));
        Ok(Self::assemble(Arc::new(store), oracle, config))
    }

    fn assemble(store: Arc<S>, oracle: Arc<dyn VersionOracle>, config: TernConfig) -> Self {
        let manager_config = ManagerConfig {
            auto_compact_every: config.compaction.auto_compact_every,
        };
        tracing::debug!(?config, "Opening database");
        Self {
            inner: Arc::new(TransactionManager::with_config(
                store,
                oracle,
                manager_config,
            )),
            config,
        }
    }

    /// Start a transaction.
    pub fn begin(&self) -> Result<Transaction> {
        Ok(self.inner.begin()?)
    }

    /// Write `value` under `key` in `txn`.
    pub fn put(&self, txn: &Transaction, key: Key, value: impl Into<Value>) -> Result<()> {
        Ok(self.inner.put(txn, key, value)?)
    }

    /// Read `key` as seen by `txn`.
    ///
    /// Returns `None` if the key does not exist at the snapshot.
    pub fn get(&self, txn: &Transaction, key: &Key) -> Result<Option<Value>> {
        Ok(self.inner.get(txn, key)?)
    }

    /// Delete `key` in `txn`.
    pub fn delete(&self, txn: &Transaction, key: Key) -> Result<()> {
        Ok(self.inner.delete(txn, key)?)
    }

    /// Read every visible key in `range`, ascending.
    pub fn scan(&self, txn: &Transaction, range: &KeyRange) -> Result<Vec<(Key, Value)>> {
        Ok(self.inner.scan(txn, range)?)
    }

    /// Commit `txn`, returning its commit version.
    ///
    /// Fails with [`Error::Rollback`](crate::Error::Rollback) if a concurrent transaction committed
    /// one of the same keys first.
    pub fn commit(&self, txn: &Transaction) -> Result<Version> {
        Ok(self.inner.commit(txn)?)
    }

    /// Roll back `txn`.
    ///
    /// A second rollback is a no-op; rolling back a committed transaction
    /// fails with [`Error::InvalidState`](crate::Error::InvalidState).
    pub fn rollback(&self, txn: &Transaction) -> Result<()> {
        Ok(self.inner.rollback(txn)?)
    }

    /// Run `f` in a new transaction, committing on success.
    ///
    /// If `f` fails the transaction is rolled back and `f`'s error
    /// returned. A commit conflict is returned as-is; the closure is not
    /// retried.
    pub fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction) -> Result<T>,
    {
        let txn = self.begin()?;
        match f(&txn) {
            Ok(value) => {
                self.commit(&txn)?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = self.rollback(&txn) {
                    tracing::warn!(txn = %txn.id(), error = %rollback_err, "Rollback after failed closure also failed");
                }
                Err(e)
            }
        }
    }

    /// Settle pending write sets and reclaim old versions.
    pub fn compact(&self) -> Result<CompactionReport> {
        Ok(self.inner.compact()?)
    }

    /// Get transaction metrics.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics()
    }

    /// Handle scoped to one table.
    pub fn table(&self, name: impl Into<String>) -> Table<S> {
        Table::new(name.into(), Arc::clone(&self.inner))
    }

    /// Raw newest cell of `key`, outside any transaction.
    pub fn read_latest(&self, key: &Key) -> Result<Option<Cell>> {
        Ok(self.inner.read_latest(key)?)
    }

    /// Most recently issued version.
    pub fn current_version(&self) -> Version {
        self.inner.current_version()
    }

    /// Number of live active transactions.
    pub fn active_count(&self) -> usize {
        self.inner.active_count()
    }

    /// Configuration the database was opened with.
    pub fn config(&self) -> &TernConfig {
        &self.config
    }

    /// Underlying storage backend.
    pub fn backend(&self) -> &Arc<S> {
        self.inner.backend()
    }

    /// Underlying transaction manager.
    pub fn manager(&self) -> &TransactionManager<S> {
        &self.inner
    }
}

impl<S> Clone for Tern<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            config: self.config.clone(),
        }
    }
}

impl<S> std::fmt::Debug for Tern<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tern")
            .field("manager", &self.inner)
            .field("config", &self.config)
            .finish()
    }
}

/// Builder for database configuration.
///
/// # Example
///
/// ```
/// use terndb::{Tern, TernConfig};
/// use tern_storage::MemoryStore;
///
/// // Defaults, in-memory backend
/// let db = Tern::builder().open()?;
///
/// // From a parsed config file, over an explicit backend
/// let config = TernConfig::from_toml_str("[compaction]\nauto_compact_every = 10\n")?;
/// let db = Tern::builder().config(config).open_with_store(MemoryStore::new())?;
/// # Ok::<(), terndb::Error>(())
/// ```
#[derive(Default)]
pub struct TernBuilder {
    config: TernConfig,
    oracle: Option<Arc<dyn VersionOracle>>,
}

impl TernBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest version already in use; the first issued version is one above.
    ///
    /// Ignored when a custom oracle is supplied.
    pub fn initial_version(mut self, version: u64) -> Self {
        self.config.oracle.initial_version = version;
        self
    }

    /// Compact after every N commits; 0 disables.
    pub fn auto_compact_every(mut self, commits: u64) -> Self {
        self.config.compaction.auto_compact_every = commits;
        self
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: TernConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a custom version oracle, e.g. a remote sequencing service.
    pub fn oracle(mut self, oracle: Arc<dyn VersionOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    /// Open over a fresh in-memory store.
    pub fn open(self) -> Result<Tern<MemoryStore>> {
        self.open_with_store(MemoryStore::new())
    }

    /// Open over the given backend.
    pub fn open_with_store<S: VersionedStorage>(self, store: S) -> Result<Tern<S>> {
        match self.oracle {
            Some(oracle) => Ok(Tern::assemble(Arc::new(store), oracle, self.config)),
            None => Tern::open_with(store, self.config),
        }
    }
}

impl std::fmt::Debug for TernBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TernBuilder")
            .field("config", &self.config)
            .field("oracle", &self.oracle)
            .finish()
    }
}
