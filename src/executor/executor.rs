//! Statement Executor for LedgerDB
//!
//! This module dispatches parsed statements against a database and returns
//! results.

use serde::Serialize;
use tracing::debug;

use crate::database::{Database, WriteOutcome};
use crate::error::{Error, Result};
use crate::sql::ast::*;
use crate::storage::{ResultSet, Row, Table, Tuple, Value};

/// Query result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    /// Column names
    pub columns: Vec<String>,
    /// Result rows
    pub rows: Vec<Tuple>,
    /// Number of affected rows (for INSERT/UPDATE/DELETE)
    pub affected_rows: usize,
    /// Message
    pub message: Option<String>,
}

impl QueryResult {
    /// Create a new empty result
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            affected_rows: 0,
            message: None,
        }
    }

    /// Create a result with a message
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::empty()
        }
    }

    /// Create a result with affected rows count
    pub fn with_affected_rows(count: usize, message: impl Into<String>) -> Self {
        Self {
            affected_rows: count,
            message: Some(message.into()),
            ..Self::empty()
        }
    }

    /// Rows as column name to value maps
    pub fn to_rows(&self) -> Vec<Row> {
        ResultSet::new(self.columns.clone(), self.rows.clone()).to_rows()
    }
}

impl From<ResultSet> for QueryResult {
    fn from(result: ResultSet) -> Self {
        Self {
            columns: result.columns,
            rows: result.rows,
            ..Self::empty()
        }
    }
}

/// Execute any statement
pub fn execute(db: &mut Database, statement: Statement) -> Result<QueryResult> {
    debug!(?statement, "executing statement");
    match statement {
        Statement::CreateTable(stmt) => execute_create_table(db, &stmt),
        Statement::DropTable(stmt) => execute_drop_table(db, &stmt),
        Statement::Insert(stmt) => execute_insert(db, stmt),
        Statement::Update(stmt) => execute_update(db, stmt),
        Statement::Delete(stmt) => execute_delete(db, stmt),
        Statement::BeginTransaction => {
            let id = db.begin_transaction()?;
            Ok(QueryResult::with_message(format!("Transaction {} started", id)))
        }
        Statement::Commit => {
            let id = db.commit()?;
            Ok(QueryResult::with_message(format!("Transaction {} committed", id)))
        }
        Statement::Rollback => {
            let id = db.rollback()?;
            Ok(QueryResult::with_message(format!("Transaction {} rolled back", id)))
        }
        read => execute_read(db, &read),
    }
}

/// Execute a statement that only reads
pub fn execute_read(db: &Database, statement: &Statement) -> Result<QueryResult> {
    match statement {
        Statement::Select(stmt) => execute_select(db, stmt),
        Statement::ShowTables => Ok(QueryResult {
            columns: vec!["table".to_string()],
            rows: db
                .list_tables()
                .into_iter()
                .map(|name| Tuple::new(vec![Value::Text(name)]))
                .collect(),
            ..QueryResult::empty()
        }),
        other => Err(Error::Internal(format!(
            "statement needs write access: {:?}",
            other
        ))),
    }
}

fn execute_create_table(db: &mut Database, stmt: &CreateTableStatement) -> Result<QueryResult> {
    db.create_table(stmt.to_table_def()?)?;
    Ok(QueryResult::with_message(format!(
        "Table '{}' created",
        stmt.table_name
    )))
}

fn execute_drop_table(db: &mut Database, stmt: &DropTableStatement) -> Result<QueryResult> {
    db.drop_tables(&stmt.table_names)?;
    let message = match stmt.table_names.as_slice() {
        [single] => format!("Table '{}' dropped", single),
        many => format!("Tables {} dropped", quoted_list(many)),
    };
    Ok(QueryResult::with_message(message))
}

fn execute_insert(db: &mut Database, stmt: InsertStatement) -> Result<QueryResult> {
    let table = db.table(&stmt.table_name)?;
    let columns: Vec<String> = match stmt.columns {
        Some(columns) => columns,
        None => table
            .schema()
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect(),
    };

    let mut rows = Vec::with_capacity(stmt.values.len());
    for values in &stmt.values {
        if values.len() != columns.len() {
            return Err(Error::Schema(format!(
                "table '{}' expects {} values, got {}",
                stmt.table_name,
                columns.len(),
                values.len()
            )));
        }
        rows.push(
            columns
                .iter()
                .cloned()
                .zip(values.iter().map(Literal::to_value))
                .collect::<Row>(),
        );
    }

    let outcome = db.insert_rows(&stmt.table_name, rows)?;
    Ok(outcome_result(db, outcome, "INSERT", "inserted"))
}

fn execute_update(db: &mut Database, stmt: UpdateStatement) -> Result<QueryResult> {
    let changes: Row = stmt
        .assignments
        .iter()
        .map(|a| (a.column.clone(), a.value.to_value()))
        .collect();
    let predicate = to_predicate(&stmt.where_clause);

    let outcome = db.update(&stmt.table_name, changes, predicate)?;
    Ok(outcome_result(db, outcome, "UPDATE", "updated"))
}

fn execute_delete(db: &mut Database, stmt: DeleteStatement) -> Result<QueryResult> {
    let predicate = to_predicate(&stmt.where_clause);
    let outcome = db.delete(&stmt.table_name, predicate)?;
    Ok(outcome_result(db, outcome, "DELETE", "deleted"))
}

fn outcome_result(db: &Database, outcome: WriteOutcome, kind: &str, verb: &str) -> QueryResult {
    match outcome {
        WriteOutcome::Applied(count) => {
            QueryResult::with_affected_rows(count, format!("{} row(s) {}", count, verb))
        }
        WriteOutcome::Staged => {
            let id = db.transaction().map(|t| t.id()).unwrap_or_default();
            QueryResult::with_message(format!("{} staged in transaction {}", kind, id))
        }
    }
}

fn execute_select(db: &Database, stmt: &SelectStatement) -> Result<QueryResult> {
    let Some(join) = &stmt.join else {
        let table = db.table(&stmt.from)?;
        let predicate = to_predicate(&stmt.where_clause);
        let result = table.select(&predicate)?;
        let result = match &stmt.columns {
            Some(columns) => {
                let names = columns
                    .iter()
                    .map(|c| local_column(table, c))
                    .collect::<Result<Vec<_>>>()?;
                result.project(&names)?
            }
            None => result,
        };
        return Ok(result.into());
    };

    // ON may name the joined table first
    let (local, other) = if join.left.table.as_deref() == Some(join.table.as_str())
        && join.right.table.as_deref() != Some(join.table.as_str())
    {
        (&join.right, &join.left)
    } else {
        (&join.left, &join.right)
    };
    check_qualifier(local, &stmt.from)?;
    check_qualifier(other, &join.table)?;

    let result = db.join(
        &stmt.from,
        &join.table,
        &local.column,
        &other.column,
        join.kind,
    )?;
    let result = result.filter(&to_predicate(&stmt.where_clause))?;
    let result = match &stmt.columns {
        Some(columns) => {
            let names: Vec<String> = columns.iter().map(ColumnRef::to_string).collect();
            result.project(&names)?
        }
        None => result,
    };
    Ok(result.into())
}

/// Resolve a select-list column of a single-table query
fn local_column(table: &Table, column: &ColumnRef) -> Result<String> {
    check_qualifier(column, table.name())?;
    Ok(table.column(&column.column)?.name.clone())
}

fn check_qualifier(column: &ColumnRef, table: &str) -> Result<()> {
    match &column.table {
        Some(t) if t != table => Err(Error::ColumnNotFound(
            column.column.clone(),
            t.clone(),
        )),
        _ => Ok(()),
    }
}

fn quoted_list(names: &[String]) -> String {
    names
        .iter()
        .map(|n| format!("'{}'", n))
        .collect::<Vec<_>>()
        .join(", ")
}
