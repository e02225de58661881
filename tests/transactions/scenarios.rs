//! Reference Scenarios
//!
//! The simple, rollback and never-ending transaction walkthroughs, plus
//! the three labelled scenarios they reduce to.

use crate::common::*;
use terndb::prelude::*;

const DATA1: &str = "testWrite-1";
const DATA2: &str = "testWrite-2";
const DATA6: &str = "testWrite-6";

// =============================================================================
// LABELLED SCENARIOS
// =============================================================================

#[test]
fn scenario_a_commit_then_read() {
    let db = create_db();
    let t1 = db.begin().unwrap();
    db.put(&t1, key(TEST_ROW), "v1").unwrap();
    db.commit(&t1).unwrap();

    let t1_prime = db.begin().unwrap();
    assert_eq!(read(&db, &t1_prime, TEST_ROW).as_deref(), Some("v1"));
}

#[test]
fn scenario_b_reader_begun_before_commit() {
    let db = create_db();
    commit_value(&db, TEST_ROW, "v0");

    let t2 = db.begin().unwrap();
    db.put(&t2, key(TEST_ROW), "v2").unwrap();
    let t3 = db.begin().unwrap();
    assert_eq!(read(&db, &t3, TEST_ROW).as_deref(), Some("v0"));

    db.commit(&t2).unwrap();
    let t4 = db.begin().unwrap();
    assert_eq!(read(&db, &t4, TEST_ROW).as_deref(), Some("v2"));
    assert_eq!(read(&db, &t3, TEST_ROW).as_deref(), Some("v0"));
}

#[test]
fn scenario_c_rollback_after_commit() {
    let db = create_db();
    let t1 = db.begin().unwrap();
    db.put(&t1, key(TEST_ROW), "v1").unwrap();
    db.commit(&t1).unwrap();

    let err = db.rollback(&t1).unwrap_err();
    assert!(err.is_invalid_state());
    assert_eq!(t1.status(), TransactionStatus::Committed);
    assert_eq!(read_fresh(&db, TEST_ROW).as_deref(), Some("v1"));
}

// =============================================================================
// WALKTHROUGHS
// =============================================================================

#[test]
fn simple_transaction() {
    let db = create_db();
    let table = db.table(TEST_TABLE);

    let t1 = db.begin().unwrap();
    table.put(&t1, TEST_ROW, DATA1).unwrap();
    db.commit(&t1).unwrap();

    let raw = table.read_latest(TEST_ROW).unwrap().unwrap();
    assert_eq!(raw.value, Some(Value::from(DATA1)));

    let t2 = db.begin().unwrap();
    table.put(&t2, TEST_ROW, DATA2).unwrap();
    let tread = db.begin().unwrap();

    // Raw table shows the uncommitted write
    let raw = table.read_latest(TEST_ROW).unwrap().unwrap();
    assert_eq!(raw.value, Some(Value::from(DATA2)));
    assert_eq!(raw.status, CellStatus::Provisional);

    // The writer sees its own write
    assert_eq!(table.get(&t2, TEST_ROW).unwrap(), Some(Value::from(DATA2)));

    // Another transaction does not
    assert_eq!(table.get(&tread, TEST_ROW).unwrap(), Some(Value::from(DATA1)));
}

#[test]
fn rollback_walkthrough() {
    let db = create_db();
    let table = db.table(TEST_TABLE);

    let t1 = db.begin().unwrap();
    table.put(&t1, TEST_ROW, DATA1).unwrap();
    db.commit(&t1).unwrap();
    assert!(table.read_latest(TEST_ROW).unwrap().is_some());

    assert!(db.rollback(&t1).unwrap_err().is_invalid_state());
    let raw = table.read_latest(TEST_ROW).unwrap().unwrap();
    assert_eq!(raw.value, Some(Value::from(DATA1)));
    assert!(matches!(raw.status, CellStatus::Committed { .. }));
}

#[test]
fn never_ending_transaction() {
    let db = create_db();
    let table = db.table(TEST_TABLE);
    commit_value(&db, TEST_ROW, DATA1);

    let t1 = db.begin().unwrap();
    let t2 = db.begin().unwrap();
    let previous = table.get(&t1, TEST_ROW).unwrap();
    assert_eq!(previous, Some(Value::from(DATA1)));

    table.put(&t2, TEST_ROW, DATA6).unwrap();
    assert_eq!(table.get(&t1, TEST_ROW).unwrap(), previous);

    let t3 = db.begin().unwrap();
    assert_eq!(table.get(&t3, TEST_ROW).unwrap(), previous);

    db.commit(&t2).unwrap();
    // t3 began before the commit
    assert_eq!(table.get(&t3, TEST_ROW).unwrap(), previous);

    let t4 = db.begin().unwrap();
    assert_eq!(table.get(&t4, TEST_ROW).unwrap(), Some(Value::from(DATA6)));

    // t1 and t3 are never finished
    assert_eq!(db.active_count(), 3);
}
