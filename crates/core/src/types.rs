//! Addressing and ordering types
//!
//! - [`Version`]: monotonically increasing ordering number
//! - [`Key`]: a row inside a named table
//! - [`KeyRange`]: a half-open row range inside one table

use serde::{Deserialize, Serialize};
use std::fmt;

/// Global ordering number issued by the version oracle
///
/// Used both as a transaction's snapshot (its id) and as the tag of every
/// cell written to the store. The total order on `Version` defines
/// "before" and "after" for all transactions.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Version(u64);

impl Version {
    /// The version preceding every issued version
    pub const ZERO: Version = Version(0);

    /// Largest representable version
    pub const MAX: Version = Version(u64::MAX);

    /// Wrap a raw version number
    pub const fn new(raw: u64) -> Self {
        Version(raw)
    }

    /// Raw version number
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for Version {
    fn from(raw: u64) -> Self {
        Version(raw)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Location of a versioned value: a row inside a table
///
/// Keys order by table, then lexicographically by row bytes.
///
/// # Examples
///
/// ```
/// use tern_core::Key;
///
/// let key = Key::new("test", "test-simple");
/// assert_eq!(key.table, "test");
/// assert_eq!(key.to_string(), "test/test-simple");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Key {
    /// Table the row lives in
    pub table: String,
    /// Row identifier
    pub row: Vec<u8>,
}

impl Key {
    /// Create a key from a table name and row bytes
    pub fn new(table: impl Into<String>, row: impl AsRef<[u8]>) -> Self {
        Self {
            table: table.into(),
            row: row.as_ref().to_vec(),
        }
    }

    /// Row rendered as UTF-8, if it is valid UTF-8
    pub fn row_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.row).ok()
    }

    /// Check whether this key is in `table` and its row begins with `prefix`
    pub fn starts_with(&self, table: &str, prefix: &[u8]) -> bool {
        self.table == table && self.row.starts_with(prefix)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.table, String::from_utf8_lossy(&self.row))
    }
}

/// Half-open row range `[start, end)` inside one table
///
/// `end == None` means the range runs to the end of the table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyRange {
    /// Table scanned
    pub table: String,
    /// Inclusive lower row bound
    pub start: Vec<u8>,
    /// Exclusive upper row bound
    pub end: Option<Vec<u8>>,
}

impl KeyRange {
    /// Range between two rows
    pub fn new(table: impl Into<String>, start: impl AsRef<[u8]>, end: Option<&[u8]>) -> Self {
        Self {
            table: table.into(),
            start: start.as_ref().to_vec(),
            end: end.map(|e| e.to_vec()),
        }
    }

    /// Every row of a table
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            start: Vec::new(),
            end: None,
        }
    }

    /// Every row beginning with `prefix`
    pub fn prefix(table: impl Into<String>, prefix: impl AsRef<[u8]>) -> Self {
        let start = prefix.as_ref().to_vec();
        let end = prefix_successor(&start);
        Self {
            table: table.into(),
            start,
            end,
        }
    }

    /// Check whether `key` falls inside the range
    pub fn contains(&self, key: &Key) -> bool {
        if key.table != self.table || key.row < self.start {
            return false;
        }
        match &self.end {
            Some(end) => key.row < *end,
            None => true,
        }
    }
}

/// Smallest byte string greater than every string starting with `prefix`
fn prefix_successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < u8::MAX {
            end.push(last + 1);
            return Some(end);
        }
    }
    None
}
