//! Backend Failure Tests
//!
//! A failed backend call surfaces `StorageUnavailable` and leaves the
//! transaction unchanged, so the same operation can be retried. The one
//! exception is a rollback that already purged part of the write set:
//! that transaction ends rolled back and compaction finishes the purge.

use crate::common::*;
use terndb::prelude::*;
use terndb::StorageOp;

#[test]
fn test_failed_put_is_retryable() {
    let db = create_faulty_db();
    let txn = db.begin().unwrap();
    db.backend().fail_op(StorageOp::Put, 1);

    let err = db.put(&txn, key("k"), "v").unwrap_err();
    assert!(matches!(err, Error::StorageUnavailable(_)));
    assert!(err.is_retryable());
    assert!(txn.is_active());
    assert_eq!(txn.write_count(), 0);
    assert_eq!(read(&db, &txn, "k"), None);

    db.put(&txn, key("k"), "v").unwrap();
    db.commit(&txn).unwrap();
    assert_eq!(read_fresh(&db, "k").as_deref(), Some("v"));
}

#[test]
fn test_failed_get_changes_nothing() {
    let db = create_faulty_db();
    commit_value(&db, "k", "v");
    let txn = db.begin().unwrap();
    db.backend().fail_op(StorageOp::Get, 1);

    assert!(db.get(&txn, &key("k")).is_err());
    assert_eq!(read(&db, &txn, "k").as_deref(), Some("v"));
}

#[test]
fn test_failed_rollback_leaves_transaction_active() {
    let db = create_faulty_db();
    let txn = db.begin().unwrap();
    db.put(&txn, key("a"), "1").unwrap();
    db.put(&txn, key("b"), "2").unwrap();

    db.backend().set_unavailable(true);
    let err = db.rollback(&txn).unwrap_err();
    assert!(matches!(err, Error::StorageUnavailable(_)));
    assert_eq!(txn.status(), TransactionStatus::Active);

    db.backend().set_unavailable(false);
    db.rollback(&txn).unwrap();
    assert_eq!(read_fresh(&db, "a"), None);
    assert_eq!(read_fresh(&db, "b"), None);
}

#[test]
fn test_partially_purged_write_set_never_commits() {
    let db = create_faulty_db();
    let txn = db.begin().unwrap();
    db.put(&txn, key("a"), "1").unwrap();
    db.put(&txn, key("b"), "2").unwrap();

    // Purging `a` succeeds, purging `b` fails
    db.backend().fail_op_after(StorageOp::UpdateStatus, 1, 2);
    let err = db.rollback(&txn).unwrap_err();
    assert!(matches!(err, Error::StorageUnavailable(_)));
    assert_eq!(txn.status(), TransactionStatus::RolledBack);

    let err = db.commit(&txn).unwrap_err();
    assert!(err.is_invalid_state());
    assert_eq!(read_fresh(&db, "a"), None);
    assert_eq!(read_fresh(&db, "b"), None);

    // Retrying the rollback is a no-op
    db.rollback(&txn).unwrap();

    db.backend().heal();
    let report = db.compact().unwrap();
    assert_eq!(report.settled, 1);
    assert_eq!(db.manager().pending_settlements(), 0);
    assert_eq!(read_fresh(&db, "a"), None);
    assert_eq!(read_fresh(&db, "b"), None);
}

#[test]
fn test_promotion_failure_does_not_fail_commit() {
    let db = create_faulty_db();
    let txn = db.begin().unwrap();
    db.put(&txn, key("a"), "1").unwrap();
    db.put(&txn, key("b"), "2").unwrap();

    db.backend().fail_op(StorageOp::UpdateStatus, 1);
    let commit_version = db.commit(&txn).unwrap();
    assert_eq!(txn.status(), TransactionStatus::Committed);
    assert_eq!(db.manager().pending_settlements(), 1);

    // Both keys are visible through the commit table
    assert_eq!(read_fresh(&db, "a").as_deref(), Some("1"));
    assert_eq!(read_fresh(&db, "b").as_deref(), Some("2"));

    // Compaction completes the promotion
    let report = db.compact().unwrap();
    assert_eq!(report.settled, 1);
    for row in ["a", "b"] {
        assert_eq!(
            db.read_latest(&key(row)).unwrap().unwrap().status,
            CellStatus::Committed { commit_version }
        );
    }
}

#[test]
fn test_unsettled_write_set_survives_failed_compaction() {
    let db = create_faulty_db();
    let txn = db.begin().unwrap();
    db.put(&txn, key("k"), "v").unwrap();
    db.backend().fail_op(StorageOp::UpdateStatus, 2);
    db.commit(&txn).unwrap();

    // The settle retry fails too; the entry must not be dropped
    let report = db.compact().unwrap();
    assert_eq!(report.settled, 0);
    assert_eq!(report.unsettled, 1);
    assert_eq!(read_fresh(&db, "k").as_deref(), Some("v"));
    assert!(db.read_latest(&key("k")).unwrap().unwrap().status.is_provisional());

    let report = db.compact().unwrap();
    assert_eq!(report.settled, 1);
    assert_eq!(report.commit_entries_removed, 1);
    assert_eq!(db.manager().commit_table_len(), 0);
    assert_eq!(read_fresh(&db, "k").as_deref(), Some("v"));
}

#[test]
fn test_failed_compaction_surfaces_error() {
    let db = create_faulty_db();
    commit_value(&db, "k", "v");
    db.backend().fail_op(StorageOp::Compact, 1);
    let err = db.compact().unwrap_err();
    assert!(matches!(err, Error::StorageUnavailable(_)));
    db.compact().unwrap();
}

#[test]
fn test_injected_failures_counted() {
    let db = create_faulty_db();
    let txn = db.begin().unwrap();
    db.backend().fail_next(2);
    assert!(db.put(&txn, key("k"), "v").is_err());
    assert!(db.get(&txn, &key("k")).is_err());
    assert_eq!(db.backend().injected_failures(), 2);
}
