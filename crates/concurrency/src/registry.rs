//! Active-transaction registry
//!
//! Tracks live transactions so the oldest active snapshot (the low
//! watermark) can be computed for compaction. Entries are weak: a handle
//! dropped while still active stops pinning the watermark.

use dashmap::DashMap;
use std::sync::Weak;
use tern_core::Version;

use crate::transaction::{Transaction, TxnShared};

/// Registry of active transactions keyed by id
#[derive(Debug, Default)]
pub struct ActiveTransactions {
    entries: DashMap<Version, Weak<TxnShared>>,
}

impl ActiveTransactions {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly begun transaction
    pub fn register(&self, txn: &Transaction) {
        self.entries.insert(txn.id(), txn.downgrade());
    }

    /// Remove a transaction that reached a terminal status
    pub fn deregister(&self, id: Version) {
        self.entries.remove(&id);
    }

    /// Number of registered transactions still referenced by a handle
    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.value().strong_count() > 0)
            .count()
    }

    /// Check if no live transaction is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Oldest snapshot among live transactions
    ///
    /// Entries whose handles were dropped are pruned. Returns `None` when no
    /// transaction is live.
    pub fn oldest(&self) -> Option<Version> {
        let mut oldest: Option<Version> = None;
        let mut dead = Vec::new();
        for entry in self.entries.iter() {
            if entry.value().strong_count() == 0 {
                dead.push(*entry.key());
                continue;
            }
            let id = *entry.key();
            oldest = Some(oldest.map_or(id, |current| current.min(id)));
        }
        for id in dead {
            tracing::debug!(txn = %id, "Dropping registry entry for abandoned transaction");
            self.entries.remove(&id);
        }
        oldest
    }
}
