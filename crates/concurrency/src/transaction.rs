//! Transaction handle
//!
//! A [`Transaction`] is a cheap, cloneable handle onto state owned by the
//! calling session. Its id doubles as its snapshot version and as the write
//! version of every provisional cell it stages.
//!
//! ## State Machine
//!
//! ```text
//! Active ──commit ok──────────> Committed   (terminal)
//!   │
//!   └──conflict | rollback───> RolledBack  (terminal)
//! ```
//!
//! The per-transaction mutex serializes commit, rollback and writes on one
//! transaction without touching any other transaction.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tern_core::{Error, Key, Result, Value, Version};

/// Lifecycle status of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionStatus {
    /// Accepting reads and writes
    Active,
    /// Write set committed; terminal
    Committed,
    /// Write set discarded; terminal
    RolledBack,
}

impl TransactionStatus {
    /// Check if no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransactionStatus::Active)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransactionStatus::Active => "ACTIVE",
            TransactionStatus::Committed => "COMMITTED",
            TransactionStatus::RolledBack => "ROLLED_BACK",
        };
        f.write_str(name)
    }
}

/// Mutable part of a transaction, guarded by the transaction's own lock
#[derive(Debug)]
pub(crate) struct TxnState {
    pub(crate) status: TransactionStatus,
    pub(crate) commit_version: Option<Version>,
    /// Buffered writes; `None` is a delete
    pub(crate) write_set: BTreeMap<Key, Option<Value>>,
}

impl TxnState {
    fn new() -> Self {
        Self {
            status: TransactionStatus::Active,
            commit_version: None,
            write_set: BTreeMap::new(),
        }
    }

    /// Fail with `InvalidState` unless the transaction is active
    pub(crate) fn ensure_active(&self, id: Version, op: &str) -> Result<()> {
        if self.status == TransactionStatus::Active {
            Ok(())
        } else {
            Err(Error::InvalidState(format!(
                "cannot {} transaction {}: status is {}",
                op, id, self.status
            )))
        }
    }
}

#[derive(Debug)]
pub(crate) struct TxnShared {
    pub(crate) id: Version,
    pub(crate) state: Mutex<TxnState>,
}

/// Handle to a transaction created by the transaction manager
///
/// Clones share state: committing through one clone is observed by all.
#[derive(Clone)]
pub struct Transaction {
    pub(crate) shared: Arc<TxnShared>,
}

impl Transaction {
    pub(crate) fn new(id: Version) -> Self {
        Self {
            shared: Arc::new(TxnShared {
                id,
                state: Mutex::new(TxnState::new()),
            }),
        }
    }

    /// Unique id, equal to the snapshot version
    pub fn id(&self) -> Version {
        self.shared.id
    }

    /// Version the transaction reads at
    pub fn snapshot_version(&self) -> Version {
        self.shared.id
    }

    /// Current status
    pub fn status(&self) -> TransactionStatus {
        self.shared.state.lock().status
    }

    /// Commit version, set only once committed
    pub fn commit_version(&self) -> Option<Version> {
        self.shared.state.lock().commit_version
    }

    /// Check if the transaction still accepts operations
    pub fn is_active(&self) -> bool {
        self.status() == TransactionStatus::Active
    }

    /// Number of distinct keys written
    pub fn write_count(&self) -> usize {
        self.shared.state.lock().write_set.len()
    }

    /// Check if nothing has been written
    pub fn is_read_only(&self) -> bool {
        self.write_count() == 0
    }

    pub(crate) fn downgrade(&self) -> std::sync::Weak<TxnShared> {
        Arc::downgrade(&self.shared)
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn {}", self.id())
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("Transaction")
            .field("id", &self.shared.id)
            .field("status", &state.status)
            .field("commit_version", &state.commit_version)
            .field("writes", &state.write_set.len())
            .finish()
    }
}
