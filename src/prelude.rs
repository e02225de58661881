//! Convenient imports for tern.
//!
//! ```
//! use terndb::prelude::*;
//!
//! let db = Tern::ephemeral()?;
//! let txn = db.begin()?;
//! db.put(&txn, Key::new("t", "k"), "v")?;
//! db.commit(&txn)?;
//! # Ok::<(), terndb::Error>(())
//! ```

// Main entry point
pub use crate::database::{Tern, TernBuilder};
pub use crate::table::Table;

// Configuration
pub use crate::config::TernConfig;

// Error handling
pub use crate::error::{Error, Result};

// Core types
pub use crate::types::{
    Cell, CellStatus, Key, KeyRange, Transaction, TransactionStatus, Value, Version,
    VersionedStorage,
};
