//! Database for LedgerDB
//!
//! A `Database` owns the catalog of live tables, the snapshot storage and
//! the optional explicit transaction.
//!
//! Every change runs against a clone of the catalog. The clone is saved and
//! only then replaces the live catalog, so a failed validation or a failed
//! save leaves the live state exactly as it was.

pub mod shared;

pub use shared::SharedDatabase;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, TableDef};
use crate::config::DatabaseConfig;
use crate::error::{Error, Result};
use crate::executor::{self, QueryResult};
use crate::sql::parse;
use crate::storage::{
    Condition, JoinKind, ResultSet, Row, Snapshot, Storage, Table, TableDescription,
};
use crate::transaction::{StagedOp, Transaction, TransactionState};

/// What happened to a row change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Applied and saved, touching this many rows
    Applied(usize),
    /// Buffered in the open transaction
    Staged,
}

impl WriteOutcome {
    /// Rows affected, zero when staged
    pub fn affected_rows(&self) -> usize {
        match self {
            WriteOutcome::Applied(rows) => *rows,
            WriteOutcome::Staged => 0,
        }
    }

    pub fn is_staged(&self) -> bool {
        matches!(self, WriteOutcome::Staged)
    }
}

/// An embedded relational database
#[derive(Debug)]
pub struct Database {
    name: String,
    /// None for in-memory databases
    storage: Option<Storage>,
    catalog: Catalog,
    transaction: Option<Transaction>,
    next_transaction_id: u64,
}

impl Database {
    /// Open the database described by `config`
    ///
    /// Loads the snapshot if one exists, otherwise starts empty.
    pub fn open(config: &DatabaseConfig) -> Result<Self> {
        config.validate()?;
        let storage = Storage::new(config.snapshot_path(), config.sync);

        let catalog = match storage.load() {
            Ok(snapshot) => {
                let version = snapshot.schema_version;
                let tables = snapshot.restore()?;
                info!(
                    database = %config.name,
                    tables = tables.len(),
                    schema_version = version,
                    "database loaded"
                );
                Catalog::from_tables(tables, version)
            }
            Err(Error::SnapshotNotFound(path)) => {
                info!(database = %config.name, path = %path.display(), "starting empty database");
                Catalog::new()
            }
            Err(e) => return Err(e),
        };

        Ok(Self {
            name: config.name.clone(),
            storage: Some(storage),
            catalog,
            transaction: None,
            next_transaction_id: 1,
        })
    }

    /// A database that is never saved
    pub fn in_memory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            storage: None,
            catalog: Catalog::new(),
            transaction: None,
            next_transaction_id: 1,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Snapshot storage, if persistent
    pub fn storage(&self) -> Option<&Storage> {
        self.storage.as_ref()
    }

    pub fn schema_version(&self) -> u64 {
        self.catalog.schema_version()
    }

    /// The live catalog
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Get a live table by name
    pub fn table(&self, name: &str) -> Result<&Table> {
        self.catalog.get_table(name)
    }

    pub fn list_tables(&self) -> Vec<String> {
        self.catalog.list_tables()
    }

    /// Describe a table's columns, keys and indexes
    pub fn describe(&self, name: &str) -> Result<TableDescription> {
        Ok(self.table(name)?.describe())
    }

    /// Check if an explicit transaction is open
    pub fn in_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    /// The open transaction, if any
    pub fn transaction(&self) -> Option<&Transaction> {
        self.transaction.as_ref()
    }

    // ========== Schema ==========

    /// Create a table
    pub fn create_table(&mut self, def: TableDef) -> Result<()> {
        self.ensure_no_transaction("CREATE TABLE")?;
        let name = def.name.clone();
        self.apply(|catalog| catalog.create_table(def))?;
        info!(table = %name, schema_version = self.schema_version(), "table created");
        Ok(())
    }

    /// Drop a table
    pub fn drop_table(&mut self, name: &str) -> Result<()> {
        self.drop_tables(&[name.to_string()])
    }

    /// Drop several tables at once, so tables referencing each other can go
    /// together
    pub fn drop_tables(&mut self, names: &[String]) -> Result<()> {
        self.ensure_no_transaction("DROP TABLE")?;
        self.apply(|catalog| catalog.drop_tables(names))?;
        info!(tables = ?names, schema_version = self.schema_version(), "tables dropped");
        Ok(())
    }

    // ========== Rows ==========

    /// Insert one row
    pub fn insert(&mut self, table: &str, row: Row) -> Result<WriteOutcome> {
        self.insert_rows(table, vec![row])
    }

    /// Insert rows, all or nothing
    pub fn insert_rows(&mut self, table: &str, rows: Vec<Row>) -> Result<WriteOutcome> {
        if self.transaction.is_some() {
            let t = self.table(table)?;
            for row in &rows {
                t.prepare_row(row)?;
            }
            for row in rows {
                self.stage(StagedOp::Insert {
                    table: table.to_string(),
                    row,
                })?;
            }
            return Ok(WriteOutcome::Staged);
        }

        let ids = self.apply(|catalog| catalog.insert(table, &rows))?;
        debug!(table, rows = ids.len(), "rows inserted");
        Ok(WriteOutcome::Applied(ids.len()))
    }

    /// Update rows matching `predicate`
    pub fn update(
        &mut self,
        table: &str,
        changes: Row,
        predicate: Vec<Condition>,
    ) -> Result<WriteOutcome> {
        if self.transaction.is_some() {
            let t = self.table(table)?;
            t.prepare_changes(&changes)?;
            check_predicate(t, &predicate)?;
            self.stage(StagedOp::Update {
                table: table.to_string(),
                changes,
                predicate,
            })?;
            return Ok(WriteOutcome::Staged);
        }

        let count = self.apply(|catalog| catalog.update(table, &changes, &predicate))?;
        debug!(table, rows = count, "rows updated");
        Ok(WriteOutcome::Applied(count))
    }

    /// Delete rows matching `predicate`, following foreign key policies
    pub fn delete(&mut self, table: &str, predicate: Vec<Condition>) -> Result<WriteOutcome> {
        if self.transaction.is_some() {
            check_predicate(self.table(table)?, &predicate)?;
            self.stage(StagedOp::Delete {
                table: table.to_string(),
                predicate,
            })?;
            return Ok(WriteOutcome::Staged);
        }

        let count = self.apply(|catalog| catalog.delete(table, &predicate))?;
        debug!(table, rows = count, "rows deleted");
        Ok(WriteOutcome::Applied(count))
    }

    /// Rows of `table` matching every condition
    pub fn select(&self, table: &str, predicate: &[Condition]) -> Result<ResultSet> {
        self.catalog.select(table, predicate)
    }

    /// Join two tables on `left_column = right_column`
    pub fn join(
        &self,
        left: &str,
        right: &str,
        left_column: &str,
        right_column: &str,
        kind: JoinKind,
    ) -> Result<ResultSet> {
        self.catalog
            .join(left, right, left_column, right_column, kind)
    }

    // ========== Transactions ==========

    /// Open an explicit transaction, returning its id
    pub fn begin_transaction(&mut self) -> Result<u64> {
        if let Some(txn) = &self.transaction {
            return Err(Error::Transaction(format!(
                "transaction {} is already in progress",
                txn.id()
            )));
        }
        let id = self.next_transaction_id;
        self.next_transaction_id += 1;
        self.transaction = Some(Transaction::new(id));
        debug!(transaction = id, "transaction started");
        Ok(id)
    }

    /// Apply the staged operations as one unit
    ///
    /// On failure nothing is applied and the transaction is closed.
    pub fn commit(&mut self) -> Result<u64> {
        let mut txn = self.take_transaction("COMMIT")?;
        let id = txn.id();

        if txn.is_empty() {
            txn.finish(TransactionState::Committed);
            debug!(transaction = id, "empty transaction committed");
            return Ok(id);
        }

        let result = self.apply(|catalog| {
            for op in txn.ops() {
                replay(catalog, op)?;
            }
            Ok(())
        });

        let elapsed_ms = (Utc::now() - txn.started_at()).num_milliseconds();
        match result {
            Ok(()) => {
                let ops = txn.finish(TransactionState::Committed);
                info!(
                    transaction = id,
                    operations = ops.len(),
                    elapsed_ms,
                    "transaction committed"
                );
                Ok(id)
            }
            Err(e) => {
                let ops = txn.finish(TransactionState::Aborted);
                if e.is_validation() {
                    info!(
                        transaction = id,
                        operations = ops.len(),
                        state = ?txn.state(),
                        error = %e,
                        "transaction rejected"
                    );
                } else {
                    warn!(
                        transaction = id,
                        operations = ops.len(),
                        elapsed_ms,
                        state = ?txn.state(),
                        error = %e,
                        "transaction aborted"
                    );
                }
                Err(e)
            }
        }
    }

    /// Discard the staged operations
    pub fn rollback(&mut self) -> Result<u64> {
        let mut txn = self.take_transaction("ROLLBACK")?;
        let ops = txn.finish(TransactionState::Aborted);
        debug!(
            transaction = txn.id(),
            discarded = ops.len(),
            started_at = %txn.started_at(),
            "transaction rolled back"
        );
        Ok(txn.id())
    }

    // ========== SQL ==========

    /// Parse and run one statement
    ///
    /// Parsing completes before anything runs, so a malformed statement
    /// never changes state.
    pub fn execute(&mut self, sql: &str) -> Result<QueryResult> {
        let statement = parse(sql)?;
        executor::execute(self, statement)
    }

    // ========== Internals ==========

    /// Run `f` on a copy of the catalog, save the copy, then publish it
    fn apply<T>(&mut self, f: impl FnOnce(&mut Catalog) -> Result<T>) -> Result<T> {
        let mut working = self.catalog.clone();
        let out = f(&mut working)?;
        self.persist(&working)?;
        self.catalog = working;
        Ok(out)
    }

    fn persist(&self, catalog: &Catalog) -> Result<()> {
        if let Some(storage) = &self.storage {
            let snapshot =
                Snapshot::capture(&self.name, catalog.schema_version(), catalog.tables());
            storage.save(&snapshot)?;
        }
        Ok(())
    }

    fn stage(&mut self, op: StagedOp) -> Result<()> {
        let txn = self
            .transaction
            .as_mut()
            .ok_or_else(|| Error::Internal("no transaction to stage into".to_string()))?;
        debug!(transaction = txn.id(), op = op.kind(), table = op.table(), "operation staged");
        txn.stage(op);
        Ok(())
    }

    fn take_transaction(&mut self, statement: &str) -> Result<Transaction> {
        self.transaction
            .take()
            .ok_or_else(|| Error::Transaction(format!("{}: no transaction in progress", statement)))
    }

    fn ensure_no_transaction(&self, statement: &str) -> Result<()> {
        match &self.transaction {
            Some(txn) => Err(Error::Transaction(format!(
                "{} is not allowed inside transaction {}",
                statement,
                txn.id()
            ))),
            None => Ok(()),
        }
    }
}

/// Apply one staged operation to a working catalog
fn replay(catalog: &mut Catalog, op: &StagedOp) -> Result<()> {
    match op {
        StagedOp::Insert { table, row } => {
            catalog.insert(table, std::slice::from_ref(row))?;
        }
        StagedOp::Update {
            table,
            changes,
            predicate,
        } => {
            catalog.update(table, changes, predicate)?;
        }
        StagedOp::Delete { table, predicate } => {
            catalog.delete(table, predicate)?;
        }
    }
    Ok(())
}

/// Every condition must name a column of `table`
fn check_predicate(table: &Table, predicate: &[Condition]) -> Result<()> {
    for condition in predicate {
        table.column(&condition.column)?;
    }
    Ok(())
}
