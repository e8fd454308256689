//! Property-based tests for table and ledger invariants

use std::collections::HashSet;

use ledgerdb::catalog::{Column, DataType, TableBuilder};
use ledgerdb::ledger::{verify_entries, FinancialEvent, Ledger, LedgerEntry};
use ledgerdb::{row, CompareOp, Condition, Database, Error, Value};
use proptest::prelude::*;
use rust_decimal::Decimal;

// ============================================================================
// Table Invariants
// ============================================================================

fn accounts_db() -> Database {
    let mut db = Database::in_memory("props");
    db.create_table(
        TableBuilder::new("accounts")
            .primary_key("id")
            .with_column(Column::new("code", DataType::Text).unique(true))
            .column("tier", DataType::Integer)
            .build(),
    )
    .unwrap();
    db
}

fn op_strategy() -> impl Strategy<Value = CompareOp> {
    prop_oneof![
        Just(CompareOp::Eq),
        Just(CompareOp::Neq),
        Just(CompareOp::Lt),
        Just(CompareOp::Lte),
        Just(CompareOp::Gt),
        Just(CompareOp::Gte),
    ]
}

proptest! {
    /// Property: index lookups return exactly what a full scan returns,
    /// whatever history of inserts, key-changing updates and deletes ran
    #[test]
    fn index_matches_scan(
        history in prop::collection::vec(
            (0u8..3, 0i64..40, 0u8..12, prop::option::of(0i64..5)),
            0..60,
        ),
        key in 0i64..40,
        code in 0u8..12,
        op in op_strategy(),
        tier in 0i64..5,
    ) {
        let mut db = accounts_db();
        for (kind, id, code, tier) in history {
            // collisions are expected and simply rejected
            let _ = match kind {
                0 => db.insert("accounts", row([
                    ("id", Value::from(id)),
                    ("code", Value::from(format!("c{}", code))),
                    ("tier", Value::from(tier)),
                ])),
                1 => db.update(
                    "accounts",
                    row([("id", Value::from(id)), ("tier", Value::from(tier))]),
                    vec![Condition::eq("code", format!("c{}", code))],
                ),
                _ => db.delete("accounts", vec![Condition::eq("code", format!("c{}", code))]),
            };
        }
        let table = db.table("accounts").unwrap();

        let predicates = vec![
            vec![Condition::eq("id", key)],
            vec![Condition::eq("code", format!("c{}", code))],
            vec![Condition::eq("id", key), Condition::new("tier", op, tier)],
            vec![Condition::new("tier", op, tier), Condition::eq("code", format!("c{}", code))],
            vec![Condition::new("id", op, key)],
        ];
        for predicate in predicates {
            prop_assert_eq!(
                table.select_ids(&predicate).unwrap(),
                table.scan_ids(&predicate).unwrap()
            );
        }
    }

    /// Property: keys stay unique whatever mix of inserts and updates runs
    #[test]
    fn keys_stay_unique(
        ops in prop::collection::vec((any::<bool>(), 0i64..10, 0u8..6, 0i64..10), 1..40),
    ) {
        let mut db = accounts_db();
        for (is_insert, id, code, target) in ops {
            let result = if is_insert {
                db.insert("accounts", row([
                    ("id", Value::from(id)),
                    ("code", Value::from(format!("c{}", code))),
                ]))
            } else {
                db.update(
                    "accounts",
                    row([("code", Value::from(format!("c{}", code)))]),
                    vec![Condition::new("id", CompareOp::Gte, target)],
                )
            };
            if let Err(e) = result {
                prop_assert!(matches!(e, Error::ConstraintViolation(_)));
            }
        }

        let table = db.table("accounts").unwrap();
        let ids: HashSet<_> = table.rows().map(|(_, t)| t.values()[0].clone()).collect();
        let codes: HashSet<_> = table.rows().map(|(_, t)| t.values()[1].clone()).collect();
        prop_assert_eq!(ids.len(), table.len());
        prop_assert_eq!(codes.len(), table.len());
    }
}

// ============================================================================
// Ledger Invariants
// ============================================================================

fn chain(len: usize) -> Vec<LedgerEntry> {
    let ledger = Ledger::in_memory("props");
    for n in 0..len {
        let event = FinancialEvent::transfer(
            format!("tx-{}", n),
            format!("acct-{}", n % 3),
            format!("acct-{}", (n + 1) % 3),
            Decimal::new(100 + n as i64, 2),
            "USD",
        );
        ledger.append(event).unwrap();
    }
    ledger.entries()
}

proptest! {
    /// Property: any sequence of appends verifies
    #[test]
    fn appended_chain_verifies(len in 0usize..20) {
        let entries = chain(len);
        let report = verify_entries(&entries);
        prop_assert!(report.valid);
        prop_assert_eq!(report.entries_checked, len);
    }

    /// Property: changing one stored field of one entry is reported at that entry
    #[test]
    fn tampering_is_located(len in 1usize..12, pick in any::<prop::sample::Index>(), field in 0u8..4) {
        let mut entries = chain(len);
        let target = pick.index(len);
        let entry = &mut entries[target];
        match field {
            0 => entry.payload.amount += Decimal::ONE,
            1 => entry.payload.account_id.push('x'),
            2 => entry.hash = format!("{:064x}", target + 1),
            _ => entry.previous_hash = format!("{:064x}", target + 7),
        }

        let report = Ledger::from_entries("tampered", entries).verify_chain();
        prop_assert!(!report.valid);
        prop_assert_eq!(report.first_invalid_index, Some(target as u64));
    }
}
