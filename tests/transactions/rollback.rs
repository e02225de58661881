//! Rollback Tests
//!
//! Rolled-back writes are permanently invisible; rollback is idempotent and
//! refuses to undo a commit.

use crate::common::*;
use terndb::prelude::*;

#[test]
fn test_rollback_hides_writes_from_later_snapshots() {
    let db = create_db();
    commit_value(&db, "k", "before");
    let txn = db.begin().unwrap();
    db.put(&txn, key("k"), "discarded").unwrap();
    db.put(&txn, key("new"), "discarded").unwrap();
    db.rollback(&txn).unwrap();

    for _ in 0..3 {
        assert_eq!(read_fresh(&db, "k").as_deref(), Some("before"));
        assert_eq!(read_fresh(&db, "new"), None);
    }
}

#[test]
fn test_rollback_twice_same_state() {
    let db = create_db();
    let txn = db.begin().unwrap();
    db.put(&txn, key("k"), "v").unwrap();
    db.rollback(&txn).unwrap();
    let once = (db.metrics(), db.read_latest(&key("k")).unwrap());

    db.rollback(&txn).unwrap();
    let twice = (db.metrics(), db.read_latest(&key("k")).unwrap());
    assert_eq!(once, twice);
}

#[test]
fn test_reads_after_rollback_exclude_own_writes() {
    let db = create_db();
    commit_value(&db, "k", "committed");
    let txn = db.begin().unwrap();
    db.put(&txn, key("k"), "mine").unwrap();
    assert_eq!(read(&db, &txn, "k").as_deref(), Some("mine"));

    db.rollback(&txn).unwrap();
    assert_eq!(read(&db, &txn, "k").as_deref(), Some("committed"));
}

#[test]
fn test_operations_after_rollback_fail() {
    let db = create_db();
    let txn = db.begin().unwrap();
    db.rollback(&txn).unwrap();

    assert!(db.put(&txn, key("k"), "v").unwrap_err().is_invalid_state());
    assert!(db.delete(&txn, key("k")).unwrap_err().is_invalid_state());
    assert!(db.commit(&txn).unwrap_err().is_invalid_state());
}

#[test]
fn test_rollback_after_conflict_is_noop() {
    let db = create_db();
    let loser = db.begin().unwrap();
    db.put(&loser, key("k"), "lose").unwrap();
    commit_value(&db, "k", "win");
    assert!(db.commit(&loser).unwrap_err().is_rollback());

    db.rollback(&loser).unwrap();
    assert_eq!(loser.status(), TransactionStatus::RolledBack);
}

#[test]
fn test_rollback_of_read_only_transaction() {
    let db = create_db();
    let txn = db.begin().unwrap();
    db.rollback(&txn).unwrap();
    assert_eq!(db.active_count(), 0);
    assert_eq!(db.metrics().rolled_back, 1);
}
