//! Fault-injecting storage wrapper
//!
//! Wraps any backend and turns selected calls into
//! [`Error::StorageUnavailable`], the signal a remote store gives on
//! failure or timeout. Used to exercise the transaction core's guarantee
//! that a failed backend call leaves the transaction unchanged.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tern_core::{
    Cell, CellStatus, CompactionStats, Error, Key, KeyRange, Result, Value, Version,
    VersionedStorage,
};

/// Backend call kinds that can be failed selectively
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageOp {
    /// `get`
    Get,
    /// `scan`
    Scan,
    /// `put`
    Put,
    /// `update_status`
    UpdateStatus,
    /// `latest`
    Latest,
    /// `compact`
    Compact,
}

#[derive(Debug, Default)]
struct FaultPlan {
    unavailable: bool,
    fail_any: usize,
    fail_op: HashMap<StorageOp, usize>,
    pass_op: HashMap<StorageOp, usize>,
}

impl FaultPlan {
    /// Decide whether this call fails, consuming one planned failure
    fn should_fail(&mut self, op: StorageOp) -> bool {
        if self.unavailable {
            return true;
        }
        if let Some(passing) = self.pass_op.get_mut(&op) {
            if *passing > 0 {
                *passing -= 1;
                return false;
            }
        }
        if let Some(remaining) = self.fail_op.get_mut(&op) {
            if *remaining > 0 {
                *remaining -= 1;
                return true;
            }
        }
        if self.fail_any > 0 {
            self.fail_any -= 1;
            return true;
        }
        false
    }
}

/// Storage wrapper that fails calls on demand
///
/// # Example
///
/// ```
/// use tern_core::{Key, Version, VersionedStorage};
/// use tern_storage::{FaultyStore, MemoryStore};
///
/// let store = FaultyStore::new(MemoryStore::new());
/// store.fail_next(1);
/// assert!(store.get(&Key::new("t", "k"), Version::MAX).is_err());
/// assert!(store.get(&Key::new("t", "k"), Version::MAX).is_ok());
/// ```
#[derive(Debug)]
pub struct FaultyStore<S> {
    inner: S,
    plan: Mutex<FaultPlan>,
    injected: AtomicU64,
}

impl<S: VersionedStorage> FaultyStore<S> {
    /// Wrap a backend; no faults are planned initially
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            plan: Mutex::new(FaultPlan::default()),
            injected: AtomicU64::new(0),
        }
    }

    /// Wrapped backend
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Fail every call until turned off
    pub fn set_unavailable(&self, unavailable: bool) {
        self.plan.lock().unavailable = unavailable;
    }

    /// Fail the next `count` calls of any kind
    pub fn fail_next(&self, count: usize) {
        self.plan.lock().fail_any = count;
    }

    /// Fail the next `count` calls of one kind
    pub fn fail_op(&self, op: StorageOp, count: usize) {
        self.plan.lock().fail_op.insert(op, count);
    }

    /// Let the next `pass` calls of one kind through, then fail `count`
    pub fn fail_op_after(&self, op: StorageOp, pass: usize, count: usize) {
        let mut plan = self.plan.lock();
        plan.pass_op.insert(op, pass);
        plan.fail_op.insert(op, count);
    }

    /// Clear every planned fault
    pub fn heal(&self) {
        *self.plan.lock() = FaultPlan::default();
    }

    /// Number of calls failed so far
    pub fn injected_failures(&self) -> u64 {
        self.injected.load(Ordering::Relaxed)
    }

    fn check(&self, op: StorageOp) -> Result<()> {
        if self.plan.lock().should_fail(op) {
            self.injected.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(?op, "Injected storage failure");
            return Err(Error::StorageUnavailable(format!(
                "injected failure on {:?}",
                op
            )));
        }
        Ok(())
    }
}

impl<S: VersionedStorage> VersionedStorage for FaultyStore<S> {
    fn get(&self, key: &Key, max_version: Version) -> Result<Vec<Cell>> {
        self.check(StorageOp::Get)?;
        self.inner.get(key, max_version)
    }

    fn scan(&self, range: &KeyRange, max_version: Version) -> Result<Vec<(Key, Vec<Cell>)>> {
        self.check(StorageOp::Scan)?;
        self.inner.scan(range, max_version)
    }

    fn put(
        &self,
        key: &Key,
        version: Version,
        value: Option<Value>,
        status: CellStatus,
    ) -> Result<()> {
        self.check(StorageOp::Put)?;
        self.inner.put(key, version, value, status)
    }

    fn update_status(&self, key: &Key, version: Version, status: CellStatus) -> Result<bool> {
        self.check(StorageOp::UpdateStatus)?;
        self.inner.update_status(key, version, status)
    }

    fn latest(&self, key: &Key) -> Result<Option<Cell>> {
        self.check(StorageOp::Latest)?;
        self.inner.latest(key)
    }

    fn compact(&self, watermark: Version) -> Result<CompactionStats> {
        self.check(StorageOp::Compact)?;
        self.inner.compact(watermark)
    }
}
