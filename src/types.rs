//! Public types for the tern API.
//!
//! This module re-exports types from internal crates with a clean public interface.

// Core value types
pub use tern_core::{Cell, CellStatus, CompactionStats, Key, KeyRange, Value, Version};

// Storage backend contract and the bundled backends
pub use tern_core::VersionedStorage;
pub use tern_storage::{FaultyStore, MemoryStore, StorageOp};

// Transaction types
pub use tern_concurrency::{
    AtomicOracle, CompactionReport, MetricsSnapshot, Transaction, TransactionStatus,
    VersionOracle,
};
