//! Compaction Tests
//!
//! History below the oldest live snapshot is reclaimed without changing
//! what any live transaction reads.

use crate::common::*;
use terndb::prelude::*;

#[test]
fn test_compaction_keeps_latest_committed() {
    let db = create_db();
    for i in 0..5 {
        commit_value(&db, "k", &i.to_string());
    }
    assert_eq!(db.backend().cell_count(&key("k")), 5);

    let report = db.compact().unwrap();
    assert_eq!(report.storage.shadowed_removed, 4);
    assert_eq!(db.backend().cell_count(&key("k")), 1);
    assert_eq!(read_fresh(&db, "k").as_deref(), Some("4"));
}

#[test]
fn test_live_snapshot_pins_history() {
    let db = create_db();
    commit_value(&db, "k", "old");
    let pinned = db.begin().unwrap();
    commit_value(&db, "k", "new");
    commit_value(&db, "k", "newer");

    let report = db.compact().unwrap();
    assert_eq!(report.watermark, pinned.id());
    assert_eq!(read(&db, &pinned, "k").as_deref(), Some("old"));
    assert_eq!(db.backend().cell_count(&key("k")), 3);

    db.commit(&pinned).unwrap();
    db.compact().unwrap();
    assert_eq!(db.backend().cell_count(&key("k")), 1);
    assert_eq!(read_fresh(&db, "k").as_deref(), Some("newer"));
}

#[test]
fn test_aborted_cells_reclaimed() {
    let db = create_db();
    let txn = db.begin().unwrap();
    db.put(&txn, key("k"), "gone").unwrap();
    db.rollback(&txn).unwrap();

    let report = db.compact().unwrap();
    assert_eq!(report.storage.aborted_removed, 1);
    assert_eq!(report.storage.keys_removed, 1);
    assert!(db.read_latest(&key("k")).unwrap().is_none());
}

#[test]
fn test_abandoned_transaction_reclaimed() {
    let db = create_db();
    {
        let txn = db.begin().unwrap();
        db.put(&txn, key("k"), "orphan").unwrap();
    }
    commit_value(&db, "other", "v");

    let report = db.compact().unwrap();
    assert_eq!(report.storage.provisional_removed, 1);
    assert_eq!(read_fresh(&db, "k"), None);
}

#[test]
fn test_tombstone_compacted_away() {
    let db = create_db();
    commit_value(&db, "k", "v");
    let txn = db.begin().unwrap();
    db.delete(&txn, key("k")).unwrap();
    db.commit(&txn).unwrap();

    db.compact().unwrap();
    assert_eq!(read_fresh(&db, "k"), None);
    assert!(db.backend().cell_count(&key("k")) <= 1);
}

#[test]
fn test_commit_table_and_conflict_records_pruned() {
    let db = create_db();
    for row in ["a", "b", "c"] {
        commit_value(&db, row, "v");
    }
    assert_eq!(db.manager().commit_table_len(), 3);

    let report = db.compact().unwrap();
    assert_eq!(report.commit_entries_removed, 3);
    assert_eq!(report.conflict_records_removed, 3);
    assert_eq!(db.manager().commit_table_len(), 0);
}

#[test]
fn test_conflict_detected_across_compaction() {
    let db = create_db();
    let loser = db.begin().unwrap();
    db.put(&loser, key("k"), "lose").unwrap();
    commit_value(&db, "k", "win");

    // The live loser pins the conflict record
    db.compact().unwrap();
    assert!(db.commit(&loser).unwrap_err().is_rollback());
    assert_eq!(read_fresh(&db, "k").as_deref(), Some("win"));
}

#[test]
fn test_auto_compaction() {
    let db = Tern::builder().auto_compact_every(3).open().unwrap();
    for i in 0..3 {
        commit_value(&db, "k", &i.to_string());
    }
    assert_eq!(db.backend().cell_count(&key("k")), 1);
    assert_eq!(read_fresh(&db, "k").as_deref(), Some("2"));
}
