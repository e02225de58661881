//! Transaction manager
//!
//! Creates transactions and orchestrates commit and rollback on top of the
//! version oracle, version store, commit table and active registry.
//!
//! ## Commit Sequence
//!
//! ```text
//! 1. lock the transaction                       (per-transaction mutex)
//! 2. commit table
//!    a. entry = Committing, fenced at oracle.current()
//!    b. commit_version = oracle.next()          (no shared lock held)
//!    c. first-committer-wins check              (decision section, in memory)
//!    d. entry = Committed(commit_version) | Aborted   (VISIBILITY POINT)
//! 3. promote or purge provisional cells          (storage I/O)
//! 4. record settled keys in the entry
//! ```
//!
//! The entry flip at 2d makes the whole write set visible at once. A
//! storage failure during step 3 does not change the outcome: the keys
//! stay recorded as unsettled and compaction retries them.
//!
//! ## Low Watermark
//!
//! The oldest live snapshot, or the oracle's current version when no
//! transaction is live. `begin` allocates and registers under the shared
//! side of the admission lock so the watermark never overtakes a
//! transaction that is mid-registration.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tern_core::{
    Cell, CompactionStats, Error, Key, KeyRange, Result, Value, Version, VersionedStorage,
};

use crate::adapter::VersionStore;
use crate::commit_table::{CommitDecision, CommitOutcome, CommitTable};
use crate::metrics::{MetricsSnapshot, TransactionMetrics};
use crate::oracle::VersionOracle;
use crate::registry::ActiveTransactions;
use crate::transaction::{Transaction, TransactionStatus};
use crate::visibility::VisibilityResolver;

/// Tunables for [`TransactionManager`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ManagerConfig {
    /// Run compaction after every N successful commits; 0 disables
    pub auto_compact_every: u64,
}

/// Outcome of one compaction pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CompactionReport {
    /// Low watermark the pass ran at
    pub watermark: Version,
    /// Write sets whose cells were brought to their final status
    pub settled: usize,
    /// Write sets still waiting on storage
    pub unsettled: usize,
    /// Commit table entries dropped
    pub commit_entries_removed: usize,
    /// Per-key conflict records dropped
    pub conflict_records_removed: usize,
    /// Storage-level reclamation
    pub storage: CompactionStats,
}

/// Coordinates snapshot-isolation transactions over a versioned backend
///
/// # Thread Safety
///
/// All methods take `&self`. Operations on one transaction are serialized
/// by that transaction's own lock; the only process-wide critical section
/// is the commit table's decision section, which performs neither storage
/// nor oracle calls.
pub struct TransactionManager<S> {
    oracle: Arc<dyn VersionOracle>,
    store: VersionStore<S>,
    commits: CommitTable,
    active: ActiveTransactions,
    /// Shared by `begin`, exclusive while computing the low watermark
    admission: RwLock<()>,
    metrics: TransactionMetrics,
    config: ManagerConfig,
    commits_since_compaction: AtomicU64,
}

impl<S: VersionedStorage> TransactionManager<S> {
    /// Create a manager with default configuration
    pub fn new(backend: Arc<S>, oracle: Arc<dyn VersionOracle>) -> Self {
        Self::with_config(backend, oracle, ManagerConfig::default())
    }

    /// Create a manager with explicit configuration
    pub fn with_config(
        backend: Arc<S>,
        oracle: Arc<dyn VersionOracle>,
        config: ManagerConfig,
    ) -> Self {
        Self {
            oracle,
            store: VersionStore::new(backend),
            commits: CommitTable::new(),
            active: ActiveTransactions::new(),
            admission: RwLock::new(()),
            metrics: TransactionMetrics::new(),
            config,
            commits_since_compaction: AtomicU64::new(0),
        }
    }

    /// Start a transaction reading at a freshly issued snapshot version
    pub fn begin(&self) -> Result<Transaction> {
        let txn = {
            let _admission = self.admission.read();
            let id = self.oracle.next()?;
            let txn = Transaction::new(id);
            self.active.register(&txn);
            txn
        };
        self.metrics.record_begin();
        tracing::debug!(txn = %txn.id(), "Transaction started");
        Ok(txn)
    }

    /// Buffer a write and stage it as a provisional cell
    ///
    /// # Errors
    /// - `InvalidState` if the transaction is not active
    /// - `StorageUnavailable` if staging fails; the write is not buffered
    pub fn put(&self, txn: &Transaction, key: Key, value: impl Into<Value>) -> Result<()> {
        self.write(txn, key, Some(value.into()))
    }

    /// Buffer a delete and stage it as a provisional tombstone
    pub fn delete(&self, txn: &Transaction, key: Key) -> Result<()> {
        self.write(txn, key, None)
    }

    fn write(&self, txn: &Transaction, key: Key, value: Option<Value>) -> Result<()> {
        let mut state = txn.shared.state.lock();
        state.ensure_active(txn.id(), "write to")?;
        self.store.stage(&key, txn.id(), value.clone())?;
        state.write_set.insert(key, value);
        Ok(())
    }

    /// Value of `key` as seen by `txn`
    ///
    /// The transaction's own writes take priority unless it rolled back.
    /// Reads through a terminal transaction are best effort once compaction
    /// has moved past its snapshot.
    pub fn get(&self, txn: &Transaction, key: &Key) -> Result<Option<Value>> {
        let state = txn.shared.state.lock();
        let overlay = (state.status != TransactionStatus::RolledBack).then_some(&state.write_set);
        VisibilityResolver::new(&self.store, &self.commits).resolve(key, txn.id(), overlay)
    }

    /// Visible `(key, value)` pairs in `range`, ascending by key
    pub fn scan(&self, txn: &Transaction, range: &KeyRange) -> Result<Vec<(Key, Value)>> {
        let state = txn.shared.state.lock();
        let overlay = (state.status != TransactionStatus::RolledBack).then_some(&state.write_set);
        VisibilityResolver::new(&self.store, &self.commits).resolve_range(range, txn.id(), overlay)
    }

    /// Commit a transaction
    ///
    /// Returns the commit version.
    ///
    /// # Errors
    /// - `InvalidState` if the transaction is not active
    /// - `Rollback` if another transaction committed one of the written keys
    ///   after this snapshot; the transaction is now rolled back
    /// - `OracleUnavailable` if no commit version could be issued; the
    ///   transaction stays active
    pub fn commit(&self, txn: &Transaction) -> Result<Version> {
        let id = txn.id();
        let mut state = txn.shared.state.lock();
        state.ensure_active(id, "commit")?;

        if state.write_set.is_empty() {
            let commit_version = self.oracle.next()?;
            state.status = TransactionStatus::Committed;
            state.commit_version = Some(commit_version);
            drop(state);
            self.active.deregister(id);
            self.metrics.record_commit();
            tracing::debug!(txn = %id, commit_version = %commit_version, "Read-only transaction committed");
            return Ok(commit_version);
        }

        let keys: Vec<Key> = state.write_set.keys().cloned().collect();
        match self.commits.try_commit(id, &keys, self.oracle.as_ref())? {
            CommitDecision::Committed(commit_version) => {
                state.status = TransactionStatus::Committed;
                state.commit_version = Some(commit_version);
                drop(state);
                self.active.deregister(id);

                match self.store.promote(&keys, id, commit_version) {
                    Ok(()) => self.commits.set_unsettled(id, Vec::new()),
                    Err(e) => {
                        // Commit table is authoritative; compaction finishes the promotion
                        tracing::error!(
                            txn = %id,
                            commit_version = %commit_version,
                            unsettled = e.unsettled.len(),
                            error = %e.source,
                            "Promotion failed after commit decision"
                        );
                        self.commits.set_unsettled(id, e.unsettled);
                    }
                }

                self.metrics.record_commit();
                tracing::debug!(txn = %id, commit_version = %commit_version, writes = keys.len(), "Transaction committed");
                self.maybe_auto_compact();
                Ok(commit_version)
            }
            CommitDecision::Conflict { key, committed_at } => {
                state.status = TransactionStatus::RolledBack;
                state.write_set.clear();
                drop(state);
                self.active.deregister(id);

                match self.store.purge(&keys, id) {
                    Ok(()) => self.commits.set_unsettled(id, Vec::new()),
                    Err(e) => {
                        tracing::warn!(
                            txn = %id,
                            unsettled = e.unsettled.len(),
                            error = %e.source,
                            "Purge failed after conflict abort"
                        );
                        self.commits.set_unsettled(id, e.unsettled);
                    }
                }

                self.metrics.record_conflict();
                tracing::debug!(txn = %id, key = %key, committed_at = %committed_at, "Transaction rolled back on write-write conflict");
                Err(Error::Rollback {
                    txn: id,
                    key,
                    committed_at,
                })
            }
        }
    }

    /// Roll back a transaction, discarding its writes
    ///
    /// Rolling back an already rolled-back transaction is a no-op.
    ///
    /// # Errors
    /// - `InvalidState` if the transaction committed
    /// - `StorageUnavailable` if purging fails. When no cell was purged yet
    ///   the transaction stays active and the call may be retried. Once
    ///   part of the write set is aborted in storage the transaction can no
    ///   longer commit: it is rolled back anyway, the remaining cells are
    ///   recorded as an aborted commit table entry and compaction finishes
    ///   the purge.
    pub fn rollback(&self, txn: &Transaction) -> Result<()> {
        let id = txn.id();
        let mut state = txn.shared.state.lock();
        match state.status {
            TransactionStatus::RolledBack => return Ok(()),
            TransactionStatus::Committed => {
                return Err(Error::InvalidState(format!(
                    "cannot roll back transaction {}: already committed",
                    id
                )))
            }
            TransactionStatus::Active => {}
        }

        let keys: Vec<Key> = state.write_set.keys().cloned().collect();
        let failure = match self.store.purge(&keys, id) {
            Ok(()) => None,
            Err(e) if e.unsettled.len() == keys.len() => return Err(e.source),
            Err(e) => {
                tracing::warn!(
                    txn = %id,
                    unsettled = e.unsettled.len(),
                    error = %e.source,
                    "Rollback purged part of the write set"
                );
                self.commits.record_aborted(id, e.unsettled);
                Some(e.source)
            }
        };

        state.status = TransactionStatus::RolledBack;
        state.write_set.clear();
        drop(state);
        self.active.deregister(id);
        self.metrics.record_rollback();
        tracing::debug!(txn = %id, writes = keys.len(), "Transaction rolled back");
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Oldest snapshot any live transaction may still read at
    pub fn low_watermark(&self) -> Version {
        let _admission = self.admission.write();
        self.active
            .oldest()
            .unwrap_or_else(|| self.oracle.current())
    }

    /// Settle pending write sets and reclaim history below the watermark
    ///
    /// Storage is compacted no higher than the oldest unsettled write set,
    /// so a provisional cell whose outcome is still only in the commit
    /// table is never reclaimed.
    pub fn compact(&self) -> Result<CompactionReport> {
        let watermark = self.low_watermark();

        let mut settled = 0;
        for entry in self.commits.unsettled() {
            let result = match entry.outcome {
                CommitOutcome::Committed(commit_version) => {
                    self.store
                        .promote(&entry.keys, entry.write_version, commit_version)
                }
                CommitOutcome::Aborted | CommitOutcome::Committing => {
                    self.store.purge(&entry.keys, entry.write_version)
                }
            };
            match result {
                Ok(()) => {
                    self.commits.set_unsettled(entry.write_version, Vec::new());
                    settled += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        write_version = %entry.write_version,
                        unsettled = e.unsettled.len(),
                        error = %e.source,
                        "Settling write set failed, will retry"
                    );
                    self.commits.set_unsettled(entry.write_version, e.unsettled);
                }
            }
        }

        let (commit_entries_removed, conflict_records_removed) = self.commits.compact(watermark);
        let storage_watermark = self
            .commits
            .min_unsettled()
            .map_or(watermark, |pending| pending.min(watermark));
        let storage = self.store.compact(storage_watermark)?;

        let report = CompactionReport {
            watermark,
            settled,
            unsettled: self.commits.unsettled().len(),
            commit_entries_removed,
            conflict_records_removed,
            storage,
        };
        tracing::info!(
            watermark = %watermark,
            storage_watermark = %storage_watermark,
            settled = report.settled,
            unsettled = report.unsettled,
            commit_entries_removed,
            conflict_records_removed,
            cells_removed = storage.cells_removed(),
            "Compaction complete"
        );
        Ok(report)
    }

    fn maybe_auto_compact(&self) {
        let every = self.config.auto_compact_every;
        if every == 0 {
            return;
        }
        let count = self.commits_since_compaction.fetch_add(1, Ordering::Relaxed) + 1;
        if count % every == 0 {
            if let Err(e) = self.compact() {
                tracing::warn!(error = %e, "Automatic compaction failed");
            }
        }
    }

    /// Raw newest cell of `key`, outside any transaction
    ///
    /// Shows provisional data exactly as the backend holds it.
    pub fn read_latest(&self, key: &Key) -> Result<Option<Cell>> {
        self.store.latest(key)
    }

    /// Counter snapshot
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot(self.active.len())
    }

    /// Number of live active transactions
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Most recently issued version
    pub fn current_version(&self) -> Version {
        self.oracle.current()
    }

    /// Number of retained commit table entries
    pub fn commit_table_len(&self) -> usize {
        self.commits.len()
    }

    /// Number of write sets whose cells still await their final status
    pub fn pending_settlements(&self) -> usize {
        self.commits.unsettled().len()
    }

    /// Configuration in effect
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Underlying backend
    pub fn backend(&self) -> &Arc<S> {
        self.store.backend()
    }
}

impl<S> std::fmt::Debug for TransactionManager<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionManager")
            .field("oracle", &self.oracle)
            .field("commit_entries", &self.commits.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
