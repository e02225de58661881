//! Concurrent Session Tests
//!
//! Many threads sharing one database: lost updates are impossible and
//! readers always see a consistent snapshot.

use crate::common::*;
use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;
use terndb::prelude::*;

fn parse(value: Option<String>) -> i64 {
    value.map_or(0, |v| v.parse().expect("integer"))
}

#[test]
fn test_concurrent_increments_lose_no_updates() {
    const THREADS: usize = 8;
    const INCREMENTS: usize = 50;

    let db = create_db();
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let db = db.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let mut conflicts = 0u64;
                for _ in 0..INCREMENTS {
                    loop {
                        let txn = db.begin().unwrap();
                        let current = parse(read(&db, &txn, "counter"));
                        db.put(&txn, key("counter"), (current + 1).to_string())
                            .unwrap();
                        match db.commit(&txn) {
                            Ok(_) => break,
                            Err(e) if e.is_rollback() => conflicts += 1,
                            Err(e) => panic!("unexpected error: {}", e),
                        }
                    }
                }
                conflicts
            })
        })
        .collect();

    let conflicts: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(
        parse(read_fresh(&db, "counter")),
        (THREADS * INCREMENTS) as i64
    );

    let metrics = db.metrics();
    assert_eq!(metrics.conflicts, conflicts);
    assert_eq!(metrics.active, 0);
}

#[test]
fn test_transfers_preserve_total() {
    const ACCOUNTS: usize = 4;
    const WRITERS: usize = 4;
    const READERS: usize = 2;
    const ROUNDS: usize = 100;

    let db = create_db();
    let setup = db.begin().unwrap();
    for account in 0..ACCOUNTS {
        db.put(&setup, key(&format!("acct{}", account)), "100").unwrap();
    }
    db.commit(&setup).unwrap();
    let total = (ACCOUNTS * 100) as i64;

    let mut handles = Vec::new();
    for w in 0..WRITERS {
        let db = db.clone();
        handles.push(thread::spawn(move || {
            for round in 0..ROUNDS {
                let from = format!("acct{}", (w + round) % ACCOUNTS);
                let to = format!("acct{}", (w + round + 1) % ACCOUNTS);
                let txn = db.begin().unwrap();
                let a = parse(read(&db, &txn, &from));
                let b = parse(read(&db, &txn, &to));
                db.put(&txn, key(&from), (a - 1).to_string()).unwrap();
                db.put(&txn, key(&to), (b + 1).to_string()).unwrap();
                match db.commit(&txn) {
                    Ok(_) => {}
                    Err(e) if e.is_rollback() => {}
                    Err(e) => panic!("unexpected error: {}", e),
                }
            }
        }));
    }
    for _ in 0..READERS {
        let db = db.clone();
        handles.push(thread::spawn(move || {
            for _ in 0..ROUNDS {
                let txn = db.begin().unwrap();
                let rows = db.scan(&txn, &KeyRange::prefix(TEST_TABLE, "acct")).unwrap();
                let sum: i64 = rows
                    .iter()
                    .map(|(_, v)| v.as_str().unwrap().parse::<i64>().unwrap())
                    .sum();
                assert_eq!(sum, total, "snapshot saw a partial transfer");
                db.commit(&txn).unwrap();
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    let txn = db.begin().unwrap();
    let rows = db.scan(&txn, &KeyRange::prefix(TEST_TABLE, "acct")).unwrap();
    assert_eq!(rows.len(), ACCOUNTS);
}

#[test]
fn test_concurrent_begin_ids_unique() {
    let db = create_db();
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let db = db.clone();
            thread::spawn(move || {
                (0..200)
                    .map(|_| {
                        let txn = db.begin().unwrap();
                        db.commit(&txn).unwrap();
                        txn.id()
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut seen = HashSet::new();
    for h in handles {
        for id in h.join().unwrap() {
            assert!(seen.insert(id), "duplicate transaction id {}", id);
        }
    }
    assert_eq!(seen.len(), 1600);
}

#[test]
fn test_compaction_concurrent_with_readers() {
    let db = Tern::builder().auto_compact_every(5).open().unwrap();
    commit_value(&db, "k", "0");

    let mut handles = Vec::new();
    for t in 0..4 {
        let db = db.clone();
        handles.push(thread::spawn(move || {
            for i in 0..50 {
                let reader = db.begin().unwrap();
                let before = read(&db, &reader, "k");
                if t % 2 == 0 {
                    let writer = db.begin().unwrap();
                    db.put(&writer, key("k"), format!("{}-{}", t, i)).unwrap();
                    let _ = db.commit(&writer);
                } else {
                    db.compact().unwrap();
                }
                // A live reader keeps seeing the same value
                assert_eq!(read(&db, &reader, "k"), before);
                db.commit(&reader).unwrap();
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }
    assert!(read_fresh(&db, "k").is_some());
}
