//! Snapshot Isolation Tests
//!
//! A transaction's view is frozen at the version it began, it always sees
//! its own writes, and it never sees uncommitted or aborted writes.

use crate::common::*;
use proptest::prelude::*;
use terndb::prelude::*;

#[test]
fn test_snapshot_frozen_across_many_commits() {
    let db = create_db();
    commit_value(&db, "k", "0");
    let reader = db.begin().unwrap();

    for i in 1..20 {
        commit_value(&db, "k", &i.to_string());
        assert_eq!(read(&db, &reader, "k").as_deref(), Some("0"));
    }
    assert_eq!(read_fresh(&db, "k").as_deref(), Some("19"));
}

#[test]
fn test_own_writes_override_concurrent_commit() {
    let db = create_db();
    let mine = db.begin().unwrap();
    db.put(&mine, key("k"), "mine").unwrap();

    let theirs = db.begin().unwrap();
    db.put(&theirs, key("k"), "theirs").unwrap();
    db.put(&theirs, key("other"), "theirs").unwrap();
    db.commit(&theirs).unwrap();

    assert_eq!(read(&db, &mine, "k").as_deref(), Some("mine"));
    // Keys it never wrote still come from its snapshot
    assert_eq!(read(&db, &mine, "other"), None);
}

#[test]
fn test_uncommitted_writes_invisible() {
    let db = create_db();
    let writer = db.begin().unwrap();
    db.put(&writer, key("k"), "pending").unwrap();

    let later = db.begin().unwrap();
    assert_eq!(read(&db, &later, "k"), None);
    assert_eq!(
        db.scan(&later, &KeyRange::table(TEST_TABLE)).unwrap(),
        Vec::new()
    );
}

#[test]
fn test_multi_key_commit_is_atomic_for_readers() {
    let db = create_db();
    let writer = db.begin().unwrap();
    for row in ["a", "b", "c"] {
        db.put(&writer, key(row), "new").unwrap();
    }
    let before = db.begin().unwrap();
    db.commit(&writer).unwrap();
    let after = db.begin().unwrap();

    let rows_before = db.scan(&before, &KeyRange::table(TEST_TABLE)).unwrap();
    let rows_after = db.scan(&after, &KeyRange::table(TEST_TABLE)).unwrap();
    assert!(rows_before.is_empty());
    assert_eq!(rows_after.len(), 3);
}

#[test]
fn test_delete_visible_only_after_commit() {
    let db = create_db();
    commit_value(&db, "k", "v");

    let deleter = db.begin().unwrap();
    db.delete(&deleter, key("k")).unwrap();
    let concurrent = db.begin().unwrap();
    assert_eq!(read(&db, &deleter, "k"), None);
    assert_eq!(read(&db, &concurrent, "k").as_deref(), Some("v"));

    db.commit(&deleter).unwrap();
    assert_eq!(read(&db, &concurrent, "k").as_deref(), Some("v"));
    assert_eq!(read_fresh(&db, "k"), None);
}

#[test]
fn test_committed_transaction_still_reads_own_writes() {
    let db = create_db();
    let txn = db.begin().unwrap();
    db.put(&txn, key("k"), "mine").unwrap();
    db.commit(&txn).unwrap();
    commit_value(&db, "k", "later");

    assert_eq!(read(&db, &txn, "k").as_deref(), Some("mine"));
}

proptest! {
    /// Interleaved writers never leak a value into an earlier snapshot
    #[test]
    fn snapshot_never_sees_later_commit(
        writes in proptest::collection::vec((0u8..3, 0u32..1000), 1..20),
        reader_at in 0usize..20,
    ) {
        let db = create_db();
        let reader_at = reader_at.min(writes.len());
        let mut expected = std::collections::BTreeMap::new();
        let mut reader = None;

        for (idx, (row, value)) in writes.iter().enumerate() {
            if idx == reader_at {
                reader = Some(db.begin().unwrap());
            }
            commit_value(&db, &row.to_string(), &value.to_string());
            if reader.is_none() {
                expected.insert(row.to_string(), value.to_string());
            }
        }
        let reader = match reader {
            Some(txn) => txn,
            None => db.begin().unwrap(),
        };

        for row in 0u8..3 {
            let row = row.to_string();
            prop_assert_eq!(read(&db, &reader, &row), expected.get(&row).cloned());
        }
    }
}
