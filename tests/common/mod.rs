//! Shared helpers for integration tests.

#![allow(dead_code)]

use terndb::prelude::*;
use terndb::{FaultyStore, MemoryStore};

/// Table used by the reference scenarios
pub const TEST_TABLE: &str = "test";

/// Row used by the reference scenarios
pub const TEST_ROW: &str = "test-simple";

/// In-memory database with default settings
pub fn create_db() -> Tern {
    Tern::ephemeral().expect("Failed to create ephemeral database")
}

/// Database whose backend can be told to fail
pub fn create_faulty_db() -> Tern<FaultyStore<MemoryStore>> {
    Tern::builder()
        .open_with_store(FaultyStore::new(MemoryStore::new()))
        .expect("Failed to create faulty database")
}

/// Key in the scenario table
pub fn key(row: &str) -> Key {
    Key::new(TEST_TABLE, row)
}

/// Commit `value` at `row` in its own transaction
pub fn commit_value<S: VersionedStorage>(db: &Tern<S>, row: &str, value: &str) -> Version {
    let txn = db.begin().expect("begin");
    db.put(&txn, key(row), value).expect("put");
    db.commit(&txn).expect("commit")
}

/// Read `row` as a string through `txn`
pub fn read<S: VersionedStorage>(db: &Tern<S>, txn: &Transaction, row: &str) -> Option<String> {
    db.get(txn, &key(row))
        .expect("get")
        .and_then(|v| v.as_str().map(str::to_string))
}

/// Read `row` in a fresh read-only transaction
pub fn read_fresh<S: VersionedStorage>(db: &Tern<S>, row: &str) -> Option<String> {
    let txn = db.begin().expect("begin");
    let value = read(db, &txn, row);
    db.commit(&txn).expect("commit");
    value
}
