//! # tern
//!
//! Snapshot-isolation transactions over a multi-versioned key-value store.
//!
//! Every transaction reads a frozen snapshot taken when it began, always
//! sees its own writes, and commits all-or-nothing. Two transactions that
//! write the same key concurrently cannot both commit: the second to
//! commit is rolled back (first-committer-wins).
//!
//! ## Quick Start
//!
//! ```
//! use terndb::prelude::*;
//!
//! let db = Tern::ephemeral()?;
//! let key = Key::new("kv", "greeting");
//!
//! let writer = db.begin()?;
//! db.put(&writer, key.clone(), "hello")?;
//!
//! // Begun before the commit: never sees it
//! let early = db.begin()?;
//! db.commit(&writer)?;
//! assert_eq!(db.get(&early, &key)?, None);
//!
//! // Begun after the commit
//! let late = db.begin()?;
//! assert_eq!(db.get(&late, &key)?, Some(Value::from("hello")));
//! # Ok::<(), terndb::Error>(())
//! ```
//!
//! ## Layers
//!
//! - `tern-core` - versions, keys, cells and the storage backend contract
//! - `tern-storage` - in-memory backend and a fault-injecting wrapper
//! - `tern-concurrency` - version oracle, commit table, visibility, manager
//! - this crate - the [`Tern`] handle, [`Table`] and [`TernConfig`]

#![warn(missing_docs)]

mod config;
mod database;
mod error;
mod table;
mod types;

pub mod prelude;

// Re-export main entry points
pub use config::{CompactionConfig, OracleConfig, TernConfig};
pub use database::{Tern, TernBuilder};
pub use error::{Error, Result};
pub use table::Table;

// Re-export types
pub use types::*;
