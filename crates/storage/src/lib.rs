//! Storage backends for tern
//!
//! This crate implements the [`VersionedStorage`](tern_core::VersionedStorage)
//! contract with:
//! - MemoryStore: per-table sharded multi-version store
//! - FaultyStore: wrapper that injects backend failures

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod faulty;
pub mod memory;

pub use faulty::{FaultyStore, StorageOp};
pub use memory::MemoryStore;
