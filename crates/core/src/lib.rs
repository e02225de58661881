//! Core types for the tern transaction core
//!
//! This crate defines the vocabulary shared by every other crate:
//! - [`Version`]: the single global ordering number (a.k.a. timestamp)
//! - [`Key`] / [`KeyRange`]: addressing inside the versioned store
//! - [`Value`]: opaque cell payload
//! - [`Cell`] / [`CellStatus`]: one versioned entry of a key's history
//! - [`VersionedStorage`]: the contract a storage backend must satisfy
//! - [`Error`] / [`Result`]: typed failure signals

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cell;
pub mod error;
pub mod traits;
pub mod types;
pub mod value;

pub use cell::{Cell, CellStatus, CompactionStats};
pub use error::{Error, Result};
pub use traits::VersionedStorage;
pub use types::{Key, KeyRange, Version};
pub use value::Value;
