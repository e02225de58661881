//! Commit table
//!
//! Authoritative record of which write versions committed, keyed by the
//! writer's snapshot version. Readers consult it to decide whether a
//! provisional cell is visible without contacting the writer.
//!
//! ## Entry Lifecycle
//!
//! ```text
//! try_commit():  (absent) ──> Committing ──> Committed(commit_version)
//!                                   │
//!                                   └──────> Aborted (write-write conflict)
//! record_aborted():   (absent) ──> Aborted   (rollback with cells left to purge)
//! compact():     settled entries below the watermark are dropped
//! ```
//!
//! A cell is visible only once its entry reads `Committed`, so promoting
//! the individual cells of a write set need not be atomic: the entry is
//! the single flag that flips the whole write set at once.
//!
//! ## Commit Ordering
//!
//! The `Committing` entry is published before the oracle is asked for a
//! commit version, and the oracle call runs outside any shared lock. The
//! entry carries a fence, the oracle's current version when the entry was
//! created. Its commit version is above the fence, so a reader at or
//! below the fence never waits for the decision.
//!
//! ## Conflict Records
//!
//! The table also keeps, per key, the last version it was committed at.
//! The first-committer-wins check and the record update run together in
//! a short in-memory decision section. A commit version obtained before a
//! newer commit of the same key was recorded always fails the check,
//! because that newer commit version is above the stale writer's snapshot.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tern_core::{Key, Result, Version};

use crate::oracle::VersionOracle;

/// Outcome recorded for a write version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Commit decision in progress
    Committing,
    /// Committed at the given commit version
    Committed(Version),
    /// Rolled back by the conflict check
    Aborted,
}

/// Result of a commit decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitDecision {
    /// No conflict; the write set is committed at this version
    Committed(Version),
    /// Another transaction committed `key` after this one's snapshot
    Conflict {
        /// First conflicting key found
        key: Key,
        /// Commit version of the conflicting write
        committed_at: Version,
    },
}

#[derive(Debug)]
struct CommitRecord {
    outcome: CommitOutcome,
    /// Oracle's current version when the commit attempt started
    fence: Version,
    /// Keys whose cells do not yet carry the final status in storage
    unsettled: Vec<Key>,
}

impl CommitRecord {
    fn is_settled(&self) -> bool {
        self.outcome != CommitOutcome::Committing && self.unsettled.is_empty()
    }
}

/// Unsettled entry handed back for another settle attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsettledEntry {
    /// Writer's snapshot version
    pub write_version: Version,
    /// Decided outcome
    pub outcome: CommitOutcome,
    /// Keys still carrying the provisional status
    pub keys: Vec<Key>,
}

/// Write version → commit outcome, plus per-key conflict records
#[derive(Debug, Default)]
pub struct CommitTable {
    entries: DashMap<Version, CommitRecord>,
    last_commits: DashMap<Key, Version>,
    /// Settled entries below this version may have been dropped
    floor: AtomicU64,
    /// Serializes conflict checks; holds neither storage nor oracle calls
    decision_section: Mutex<()>,
}

impl CommitTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries retained
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no entries are retained
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of per-key conflict records retained
    pub fn conflict_records(&self) -> usize {
        self.last_commits.len()
    }

    /// Current outcome for a write version, if recorded
    pub fn outcome(&self, write_version: Version) -> Option<CommitOutcome> {
        self.entries.get(&write_version).map(|record| record.outcome)
    }

    /// Outcome for a write version as a reader at `snapshot` must see it
    ///
    /// Waits out an in-progress decision, unless the pending commit version
    /// is certain to land above `snapshot`; then `Committing` is returned
    /// and the caller treats the write as invisible. The wait covers one
    /// oracle call plus the decision section, never storage I/O.
    pub fn wait_decided(&self, write_version: Version, snapshot: Version) -> Option<CommitOutcome> {
        loop {
            let current = self
                .entries
                .get(&write_version)
                .map(|record| (record.outcome, record.fence));
            match current {
                Some((CommitOutcome::Committing, fence)) if snapshot <= fence => {
                    return Some(CommitOutcome::Committing)
                }
                Some((CommitOutcome::Committing, _)) => std::thread::yield_now(),
                other => return other.map(|(outcome, _)| outcome),
            }
        }
    }

    /// Version below which settled entries may have been compacted away
    pub fn floor(&self) -> Version {
        Version::new(self.floor.load(Ordering::Acquire))
    }

    /// Decide the commit of a write set
    ///
    /// 1. record `Committing` for `write_version`, fenced at the oracle's
    ///    current version
    /// 2. obtain the commit version from the oracle, outside any lock
    /// 3. under the decision section, check first-committer-wins against
    ///    the conflict records
    /// 4. record the decision and, on success, the new conflict records
    ///
    /// If the oracle fails the entry is removed and the error returned, so
    /// the caller's transaction is unchanged.
    pub fn try_commit(
        &self,
        write_version: Version,
        keys: &[Key],
        oracle: &dyn VersionOracle,
    ) -> Result<CommitDecision> {
        self.open(write_version, keys, oracle.current());

        let commit_version = match oracle.next() {
            Ok(version) => version,
            Err(e) => {
                self.entries.remove(&write_version);
                return Err(e);
            }
        };

        Ok(self.decide(write_version, keys, commit_version))
    }

    fn open(&self, write_version: Version, keys: &[Key], fence: Version) {
        self.entries.insert(
            write_version,
            CommitRecord {
                outcome: CommitOutcome::Committing,
                fence,
                unsettled: keys.to_vec(),
            },
        );
    }

    fn decide(&self, write_version: Version, keys: &[Key], commit_version: Version) -> CommitDecision {
        let _section = self.decision_section.lock();

        let conflict = keys.iter().find_map(|key| {
            let last = self.last_commits.get(key).map(|entry| *entry.value());
            last.filter(|committed_at| *committed_at > write_version)
                .map(|committed_at| (key.clone(), committed_at))
        });

        if let Some((key, committed_at)) = conflict {
            self.set_outcome(write_version, CommitOutcome::Aborted);
            return CommitDecision::Conflict { key, committed_at };
        }

        for key in keys {
            self.last_commits.insert(key.clone(), commit_version);
        }
        self.set_outcome(write_version, CommitOutcome::Committed(commit_version));
        CommitDecision::Committed(commit_version)
    }

    /// Record a rolled-back write set whose cells are not all purged yet
    ///
    /// Readers keep treating the listed cells as aborted, and compaction
    /// retries the purge.
    pub fn record_aborted(&self, write_version: Version, unsettled: Vec<Key>) {
        self.entries.insert(
            write_version,
            CommitRecord {
                outcome: CommitOutcome::Aborted,
                fence: Version::ZERO,
                unsettled,
            },
        );
    }

    fn set_outcome(&self, write_version: Version, outcome: CommitOutcome) {
        if let Some(mut record) = self.entries.get_mut(&write_version) {
            record.outcome = outcome;
        }
    }

    /// Record which keys still lack their final status in storage
    ///
    /// An empty list marks the entry settled.
    pub fn set_unsettled(&self, write_version: Version, keys: Vec<Key>) {
        if let Some(mut record) = self.entries.get_mut(&write_version) {
            record.unsettled = keys;
        }
    }

    /// Entries whose storage cells still need their final status
    pub fn unsettled(&self) -> Vec<UnsettledEntry> {
        self.entries
            .iter()
            .filter(|entry| {
                let record = entry.value();
                record.outcome != CommitOutcome::Committing && !record.unsettled.is_empty()
            })
            .map(|entry| UnsettledEntry {
                write_version: *entry.key(),
                outcome: entry.value().outcome,
                keys: entry.value().unsettled.clone(),
            })
            .collect()
    }

    /// Lowest write version whose entry is not settled
    pub fn min_unsettled(&self) -> Option<Version> {
        self.entries
            .iter()
            .filter(|entry| !entry.value().is_settled())
            .map(|entry| *entry.key())
            .min()
    }

    /// Drop records no transaction at or above `watermark` can need
    ///
    /// Raises the floor before dropping anything, so a reader that misses
    /// an entry can tell it may have been compacted.
    ///
    /// Returns `(entries_removed, conflict_records_removed)`.
    pub fn compact(&self, watermark: Version) -> (usize, usize) {
        self.floor.fetch_max(watermark.as_u64(), Ordering::AcqRel);

        let entries_before = self.entries.len();
        self.entries
            .retain(|write_version, record| !(*write_version < watermark && record.is_settled()));
        let conflicts_before = self.last_commits.len();
        self.last_commits
            .retain(|_, committed_at| *committed_at > watermark);

        (
            entries_before.saturating_sub(self.entries.len()),
            conflicts_before.saturating_sub(self.last_commits.len()),
        )
    }
}
