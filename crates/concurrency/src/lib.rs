//! Snapshot-isolation transaction core for tern
//!
//! This crate implements the transaction protocol with:
//! - VersionOracle: globally unique, strictly increasing versions
//! - VersionStore: provisional staging, promotion and purge over a backend
//! - CommitTable: write version → outcome, the single visibility flag
//! - VisibilityResolver: snapshot reads merged with a transaction's own writes
//! - TransactionManager: begin, commit (first-committer-wins), rollback, compaction

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapter;
pub mod commit_table;
pub mod manager;
pub mod metrics;
pub mod oracle;
pub mod registry;
pub mod transaction;
pub mod visibility;

pub use adapter::{SettleError, VersionStore};
pub use commit_table::{CommitDecision, CommitOutcome, CommitTable, UnsettledEntry};
pub use manager::{CompactionReport, ManagerConfig, TransactionManager};
pub use metrics::{MetricsSnapshot, TransactionMetrics};
pub use oracle::{AtomicOracle, VersionOracle};
pub use registry::ActiveTransactions;
pub use transaction::{Transaction, TransactionStatus};
pub use visibility::{VisibilityResolver, WriteSet};
