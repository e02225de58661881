//! Cell payloads
//!
//! The transaction core never interprets values; they are opaque bytes
//! handed through to the storage backend.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque value stored in a cell
///
/// # Examples
///
/// ```
/// use tern_core::Value;
///
/// let v = Value::from("testWrite-1");
/// assert_eq!(v.as_str(), Some("testWrite-1"));
/// assert_eq!(v.len(), 11);
/// ```
#[derive(Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Value(Vec<u8>);

impl Value {
    /// Wrap raw bytes
    pub fn new(bytes: Vec<u8>) -> Self {
        Value(bytes)
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Payload as UTF-8, if valid
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    /// Consume into the raw bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Payload length in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check for an empty payload
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value(s.as_bytes().to_vec())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value(s.into_bytes())
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value(bytes)
    }
}

impl From<&[u8]> for Value {
    fn from(bytes: &[u8]) -> Self {
        Value(bytes.to_vec())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(s) => write!(f, "Value({:?})", s),
            None => write!(f, "Value({:?})", self.0),
        }
    }
}
