//! Reference scenarios.
//!
//! Each scenario drives a fresh database through a fixed sequence of calls
//! and records whether every observation matched the snapshot-isolation
//! expectation.

use anyhow::Result;
use serde_json::{json, Value as Json};
use terndb::prelude::*;
use terndb::MetricsSnapshot;

const TABLE: &str = "test";
const ROW: &str = "test-simple";

/// One observation made during a scenario.
#[derive(Debug, Clone)]
pub struct Check {
    pub description: String,
    pub passed: bool,
}

/// Outcome of one scenario.
#[derive(Debug, Clone)]
pub struct ScenarioReport {
    pub name: &'static str,
    pub checks: Vec<Check>,
    pub metrics: MetricsSnapshot,
}

impl ScenarioReport {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            checks: Vec::new(),
            metrics: MetricsSnapshot::default(),
        }
    }

    fn check(&mut self, description: impl Into<String>, passed: bool) {
        let description = description.into();
        if passed {
            tracing::info!(scenario = self.name, %description, "Worked as expected");
        } else {
            tracing::warn!(scenario = self.name, %description, "Did not work as expected");
        }
        self.checks.push(Check {
            description,
            passed,
        });
    }

    /// True when every check passed.
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    pub fn to_json(&self) -> Json {
        json!({
            "scenario": self.name,
            "passed": self.passed(),
            "checks": self.checks.iter().map(|c| json!({
                "description": c.description,
                "passed": c.passed,
            })).collect::<Vec<_>>(),
            "metrics": {
                "started": self.metrics.started,
                "committed": self.metrics.committed,
                "rolled_back": self.metrics.rolled_back,
                "conflicts": self.metrics.conflicts,
                "active": self.metrics.active,
                "commit_rate": self.metrics.commit_rate(),
            },
        })
    }
}

/// Names accepted by [`run`].
pub const ALL: [&str; 3] = ["simple", "rollback", "never-ending"];

/// Run the named scenario on a fresh database built by `open`.
pub fn run(name: &str, open: &dyn Fn() -> Result<Tern>) -> Result<ScenarioReport> {
    let db = open()?;
    let mut report = match name {
        "simple" => simple(&db)?,
        "rollback" => rollback(&db)?,
        "never-ending" => never_ending(&db)?,
        other => anyhow::bail!("unknown scenario: {}", other),
    };
    report.metrics = db.metrics();
    Ok(report)
}

/// Commit, then read the raw table and two concurrent transactions.
fn simple(db: &Tern) -> Result<ScenarioReport> {
    let mut report = ScenarioReport::new("simple");
    let table = db.table(TABLE);
    let data1 = Value::from("testWrite-1");
    let data2 = Value::from("testWrite-2");

    let t1 = db.begin()?;
    tracing::info!(txn = %t1, "Transaction created");
    table.put(&t1, ROW, data1.clone())?;
    db.commit(&t1)?;
    let raw = table.read_latest(ROW)?.and_then(|cell| cell.value);
    report.check("committed value is in the table", raw.as_ref() == Some(&data1));

    let t2 = db.begin()?;
    table.put(&t2, ROW, data2.clone())?;
    let tread = db.begin()?;

    let raw = table.read_latest(ROW)?.and_then(|cell| cell.value);
    report.check(
        "raw table shows the uncommitted write",
        raw.as_ref() == Some(&data2),
    );
    report.check(
        "writer sees its own uncommitted write",
        table.get(&t2, ROW)?.as_ref() == Some(&data2),
    );
    report.check(
        "concurrent reader sees the last committed value",
        table.get(&tread, ROW)?.as_ref() == Some(&data1),
    );

    db.rollback(&t2)?;
    db.commit(&tread)?;
    Ok(report)
}

/// Commit, then attempt to roll the committed transaction back.
fn rollback(db: &Tern) -> Result<ScenarioReport> {
    let mut report = ScenarioReport::new("rollback");
    let table = db.table(TABLE);
    let data1 = Value::from("testWrite-1");

    let t1 = db.begin()?;
    tracing::info!(txn = %t1, "Transaction created");
    table.put(&t1, ROW, data1.clone())?;
    db.commit(&t1)?;
    report.check(
        "committed value is not null",
        table.read_latest(ROW)?.and_then(|cell| cell.value).is_some(),
    );

    let refused = matches!(db.rollback(&t1), Err(e) if e.is_invalid_state());
    report.check("rollback of a committed transaction is refused", refused);

    let reader = db.begin()?;
    report.check(
        "committed value survives the rollback attempt",
        table.get(&reader, ROW)?.as_ref() == Some(&data1),
    );
    db.commit(&reader)?;
    Ok(report)
}

/// Leave transactions open while another commits underneath them.
fn never_ending(db: &Tern) -> Result<ScenarioReport> {
    let mut report = ScenarioReport::new("never-ending");
    let table = db.table(TABLE);
    let data6 = Value::from("testWrite-6");

    let seed = db.begin()?;
    table.put(&seed, ROW, "testWrite-1")?;
    db.commit(&seed)?;

    let t1 = db.begin()?;
    let t2 = db.begin()?;
    tracing::info!(txn = %t1, "Transaction created");
    tracing::info!(txn = %t2, "Transaction created");
    let previous = table.get(&t1, ROW)?;

    table.put(&t2, ROW, data6.clone())?;
    report.check(
        "earlier reader ignores uncommitted write",
        table.get(&t1, ROW)? == previous,
    );

    let t3 = db.begin()?;
    tracing::info!(txn = %t3, "Transaction created");
    report.check(
        "later reader ignores uncommitted write",
        table.get(&t3, ROW)? == previous,
    );

    db.commit(&t2)?;
    report.check(
        "reader begun before the commit keeps its snapshot",
        table.get(&t3, ROW)? == previous,
    );

    let t4 = db.begin()?;
    tracing::info!(txn = %t4, "Transaction created");
    report.check(
        "reader begun after the commit sees it",
        table.get(&t4, ROW)?.as_ref() == Some(&data6),
    );
    Ok(report)
}
