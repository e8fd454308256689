//! End-to-end scenario: users and tasks with a cascading foreign key, then
//! a ledger of transfers that is tampered with on disk.

use std::fs;

use ledgerdb::ledger::{FinancialEvent, LedgerSet};
use ledgerdb::{Database, DatabaseConfig, Error, Value};
use rust_decimal::Decimal;
use tempfile::TempDir;

fn config(dir: &TempDir) -> DatabaseConfig {
    DatabaseConfig::new()
        .data_dir(dir.path())
        .name("app")
        .sync(false)
}

#[test]
fn test_users_and_tasks() {
    let dir = TempDir::new().unwrap();
    let mut db = Database::open(&config(&dir)).unwrap();

    db.execute("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT, email TEXT UNIQUE)")
        .unwrap();
    db.execute(r#"INSERT INTO users VALUES (1, "John", "john@example.com")"#)
        .unwrap();

    let err = db
        .execute(r#"INSERT INTO users VALUES (1, "Jane", "jane@example.com")"#)
        .unwrap_err();
    assert!(matches!(err, Error::ConstraintViolation(_)));

    let users = db.execute("SELECT * FROM users").unwrap();
    assert_eq!(users.rows.len(), 1);
    assert_eq!(users.to_rows()[0]["name"], Value::from("John"));

    db.execute(
        "CREATE TABLE tasks (id INTEGER PRIMARY KEY, user_id INTEGER, title TEXT, \
         FOREIGN KEY user_id -> users.id CASCADE)",
    )
    .unwrap();
    db.execute("INSERT INTO tasks VALUES (1, 1, 'Pay bill')").unwrap();

    db.execute("DELETE FROM users WHERE id = 1").unwrap();
    assert!(db.execute("SELECT * FROM tasks WHERE id = 1").unwrap().rows.is_empty());

    // the cascade was saved with the delete
    drop(db);
    let db = Database::open(&config(&dir)).unwrap();
    assert!(db.table("users").unwrap().is_empty());
    assert!(db.table("tasks").unwrap().is_empty());
}

#[test]
fn test_ledger_tamper_on_disk() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);

    let path = {
        let ledgers = LedgerSet::for_database(&config).unwrap();
        let ledger = ledgers.create("transactions").unwrap();
        for (n, (from, to)) in [("alice", "bob"), ("bob", "carol"), ("carol", "alice")]
            .into_iter()
            .enumerate()
        {
            let event =
                FinancialEvent::transfer(format!("tx-{}", n), from, to, Decimal::new(1000, 2), "USD");
            ledger.append(event).unwrap();
        }

        let report = ledger.verify_chain();
        assert!(report.valid);
        assert_eq!(report.entries_checked, 3);
        ledger.path().unwrap().to_path_buf()
    };

    // overwrite entry 1's amount
    let contents = fs::read_to_string(&path).unwrap();
    let mut lines: Vec<String> = contents.lines().map(str::to_string).collect();
    let mut entry: serde_json::Value = serde_json::from_str(&lines[1]).unwrap();
    entry["payload"]["amount"] = serde_json::Value::from("999.00");
    lines[1] = entry.to_string();
    fs::write(&path, lines.join("\n") + "\n").unwrap();

    let ledgers = LedgerSet::for_database(&config).unwrap();
    let ledger = ledgers.get("transactions").unwrap();
    assert_eq!(ledger.len(), 3);

    let report = ledger.verify_chain();
    assert!(!report.valid);
    assert_eq!(report.first_invalid_index, Some(1));
    assert!(matches!(
        report.into_result(),
        Err(Error::LedgerIntegrity { index: 1, .. })
    ));
}
