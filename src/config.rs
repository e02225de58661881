//! Configuration for tern.
//!
//! Loaded from TOML:
//!
//! ```toml
//! [oracle]
//! initial_version = 0
//!
//! [compaction]
//! auto_compact_every = 1000
//! ```
//!
//! Every field is optional. Unknown sections or fields are rejected.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Database configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TernConfig {
    /// Version oracle settings.
    pub oracle: OracleConfig,
    /// Compaction settings.
    pub compaction: CompactionConfig,
}

/// Version oracle settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OracleConfig {
    /// Highest version already in use; the first issued version is one above.
    pub initial_version: u64,
}

/// Compaction settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompactionConfig {
    /// Compact after every N commits; 0 disables automatic compaction.
    pub auto_compact_every: u64,
}

impl TernConfig {
    /// Creates a default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e: toml::de::Error| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Renders configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
