//! Transaction counters

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Lifetime counters kept by the transaction manager
#[derive(Debug, Default)]
pub struct TransactionMetrics {
    started: AtomicU64,
    committed: AtomicU64,
    rolled_back: AtomicU64,
    conflicts: AtomicU64,
}

impl TransactionMetrics {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_begin(&self) {
        self.started.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_commit(&self) {
        self.committed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rollback(&self) {
        self.rolled_back.fetch_add(1, Ordering::Relaxed);
    }

    /// A conflict is also counted as a rollback
    pub(crate) fn record_conflict(&self) {
        self.conflicts.fetch_add(1, Ordering::Relaxed);
        self.record_rollback();
    }

    /// Point-in-time copy of the counters
    pub fn snapshot(&self, active: usize) -> MetricsSnapshot {
        MetricsSnapshot {
            started: self.started.load(Ordering::Relaxed),
            committed: self.committed.load(Ordering::Relaxed),
            rolled_back: self.rolled_back.load(Ordering::Relaxed),
            conflicts: self.conflicts.load(Ordering::Relaxed),
            active: active as u64,
        }
    }
}

/// Serializable view of [`TransactionMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Transactions begun
    pub started: u64,
    /// Transactions committed
    pub committed: u64,
    /// Transactions rolled back, explicitly or by conflict
    pub rolled_back: u64,
    /// Commits refused by the first-committer-wins check
    pub conflicts: u64,
    /// Transactions currently active
    pub active: u64,
}

impl MetricsSnapshot {
    /// Fraction of finished transactions that committed
    pub fn commit_rate(&self) -> f64 {
        let finished = self.committed + self.rolled_back;
        if finished == 0 {
            0.0
        } else {
            self.committed as f64 / finished as f64
        }
    }
}
