//! Recording financial events alongside table changes
//!
//! A financial operation is two steps: the table change is committed first,
//! then the matching event is appended to a ledger. The steps are separate
//! stores, so a failed append cannot undo the committed change; it is
//! reported as `Error::Reconciliation` for the caller to repair.

use tracing::{error, warn};

use crate::error::{Error, Result};
use crate::ledger::{FinancialEvent, Ledger, LedgerEntry};

/// Run `mutate`, then append `event` to `ledger`
///
/// If `mutate` fails nothing is appended and its error is returned as is.
pub fn record_event<T>(
    ledger: &Ledger,
    event: FinancialEvent,
    mutate: impl FnOnce() -> Result<T>,
) -> Result<(T, LedgerEntry)> {
    let transaction_id = event.transaction_id.clone();

    let output = mutate().map_err(|e| {
        warn!(transaction_id = %transaction_id, error = %e, "table change rejected, event not recorded");
        e
    })?;

    match ledger.append(event) {
        Ok(entry) => Ok((output, entry)),
        Err(source) => {
            error!(
                ledger = ledger.name(),
                transaction_id = %transaction_id,
                error = %source,
                "ledger append failed after table change"
            );
            Err(Error::Reconciliation {
                transaction_id,
                source: Box::new(source),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use crate::storage::Value;
    use rust_decimal::Decimal;
    use tempfile::TempDir;

    fn accounts() -> Database {
        let mut db = Database::in_memory("bank");
        db.execute("CREATE TABLE accounts (id TEXT PRIMARY KEY, balance FLOAT NOT NULL)")
            .unwrap();
        db.execute("INSERT INTO accounts VALUES ('alice', 100.0), ('bob', 0.0)")
            .unwrap();
        db
    }

    #[test]
    fn test_mutation_then_append() {
        let mut db = accounts();
        let ledger = Ledger::in_memory("transactions");
        let event = FinancialEvent::transfer("tx-1", "alice", "bob", Decimal::new(25, 0), "USD");

        let (result, entry) = record_event(&ledger, event, || {
            db.execute("BEGIN")?;
            db.execute("UPDATE accounts SET balance = 75.0 WHERE id = 'alice'")?;
            db.execute("UPDATE accounts SET balance = 25.0 WHERE id = 'bob'")?;
            db.execute("COMMIT")
        })
        .unwrap();

        assert!(result.message.unwrap().contains("committed"));
        assert_eq!(entry.sequence_index, 0);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_rejected_mutation_records_nothing() {
        let mut db = accounts();
        let ledger = Ledger::in_memory("transactions");
        let event = FinancialEvent::transfer("tx-2", "alice", "bob", Decimal::ONE, "USD");

        let result = record_event(&ledger, event, || {
            db.execute("UPDATE accounts SET balance = NULL WHERE id = 'alice'")
        });

        assert!(matches!(result, Err(Error::NullNotAllowed(_))));
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_failed_append_reports_reconciliation() {
        let mut db = accounts();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("transactions.jsonl");
        let ledger = Ledger::open("transactions", &path, false).unwrap();

        // a directory in place of the ledger file makes the append fail
        std::fs::create_dir_all(&path).unwrap();

        let event = FinancialEvent::transfer("tx-3", "alice", "bob", Decimal::new(40, 0), "USD");
        let result = record_event(&ledger, event, || {
            db.execute("UPDATE accounts SET balance = 60.0 WHERE id = 'alice'")
        });

        match result {
            Err(Error::Reconciliation { transaction_id, .. }) => assert_eq!(transaction_id, "tx-3"),
            other => panic!("expected reconciliation error, got {:?}", other),
        }
        assert!(ledger.is_empty());

        // the table change stays committed
        let alice = db
            .execute("SELECT balance FROM accounts WHERE id = 'alice'")
            .unwrap();
        assert_eq!(alice.rows[0].values()[0], Value::from(60.0));
    }
}
