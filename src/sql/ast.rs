//! SQL Abstract Syntax Tree (AST)
//!
//! This module defines the AST nodes for the supported statements.

use std::fmt;

use crate::catalog::{Column, DataType, ForeignKey, Schema, TableDef};
use crate::error::{Error, Result};
use crate::storage::{CompareOp, Condition, JoinKind, Value};

/// A SQL statement
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// CREATE TABLE statement
    CreateTable(CreateTableStatement),
    /// DROP TABLE statement
    DropTable(DropTableStatement),
    /// SHOW TABLES
    ShowTables,
    /// INSERT statement
    Insert(InsertStatement),
    /// SELECT statement
    Select(SelectStatement),
    /// UPDATE statement
    Update(UpdateStatement),
    /// DELETE statement
    Delete(DeleteStatement),
    /// BEGIN TRANSACTION
    BeginTransaction,
    /// COMMIT
    Commit,
    /// ROLLBACK
    Rollback,
}

impl Statement {
    /// Does executing this statement change rows or schema?
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Statement::Select(_) | Statement::ShowTables)
    }
}

/// Literal value
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl Literal {
    /// Convert to an untyped engine value; column types are applied later
    pub fn to_value(&self) -> Value {
        match self {
            Literal::Null => Value::Null,
            Literal::Boolean(b) => Value::Boolean(*b),
            Literal::Integer(i) => Value::Integer(*i),
            Literal::Float(f) => Value::Float(*f),
            Literal::String(s) => Value::Text(s.clone()),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => write!(f, "NULL"),
            Literal::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Literal::Integer(i) => write!(f, "{}", i),
            Literal::Float(v) => write!(f, "{}", v),
            Literal::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
        }
    }
}

/// Column reference, optionally qualified by table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub table: Option<String>,
    pub column: String,
}

impl ColumnRef {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            table: None,
            column: column.into(),
        }
    }

    pub fn qualified(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            column: column.into(),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(t) => write!(f, "{}.{}", t, self.column),
            None => write!(f, "{}", self.column),
        }
    }
}

/// One `column op literal` conjunct of a WHERE clause
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub column: ColumnRef,
    pub op: CompareOp,
    pub value: Literal,
}

impl Comparison {
    /// Engine condition; the column keeps its qualifier if it had one
    pub fn to_condition(&self) -> Condition {
        Condition::new(self.column.to_string(), self.op, self.value.to_value())
    }
}

/// Convert a WHERE clause into engine conditions
pub fn to_predicate(where_clause: &[Comparison]) -> Vec<Condition> {
    where_clause.iter().map(Comparison::to_condition).collect()
}

/// Column definition
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    /// Column name
    pub name: String,
    /// Data type
    pub data_type: DataType,
    /// NOT NULL constraint
    pub not_null: bool,
    /// PRIMARY KEY constraint
    pub primary_key: bool,
    /// UNIQUE constraint
    pub unique: bool,
    /// REFERENCES clause
    pub references: Option<ForeignKey>,
}

/// Table-level constraint
#[derive(Debug, Clone, PartialEq)]
pub enum TableConstraint {
    PrimaryKey(String),
    Unique(String),
    ForeignKey { column: String, references: ForeignKey },
}

/// CREATE TABLE statement
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableStatement {
    /// Table name
    pub table_name: String,
    /// Column definitions
    pub columns: Vec<ColumnDef>,
    /// Table constraints
    pub constraints: Vec<TableConstraint>,
}

impl CreateTableStatement {
    /// Fold column and table constraints into a table definition
    pub fn to_table_def(&self) -> Result<TableDef> {
        let mut columns: Vec<Column> = self
            .columns
            .iter()
            .map(|def| {
                let mut col = Column::new(def.name.clone(), def.data_type)
                    .nullable(!def.not_null)
                    .primary_key(def.primary_key)
                    .unique(def.unique);
                col.foreign_key = def.references.clone();
                col
            })
            .collect();

        for constraint in &self.constraints {
            let name = match constraint {
                TableConstraint::PrimaryKey(c) | TableConstraint::Unique(c) => c,
                TableConstraint::ForeignKey { column, .. } => column,
            };
            let col = columns.iter_mut().find(|c| &c.name == name).ok_or_else(|| {
                Error::Schema(format!(
                    "constraint on unknown column '{}' in table '{}'",
                    name, self.table_name
                ))
            })?;

            match constraint {
                TableConstraint::PrimaryKey(_) => {
                    col.primary_key = true;
                    col.nullable = false;
                }
                TableConstraint::Unique(_) => col.unique = true,
                TableConstraint::ForeignKey { references, .. } => {
                    col.foreign_key = Some(references.clone())
                }
            }
        }

        Ok(TableDef::new(
            self.table_name.clone(),
            Schema::from_columns(columns),
        ))
    }
}

/// DROP TABLE statement
#[derive(Debug, Clone, PartialEq)]
pub struct DropTableStatement {
    pub table_names: Vec<String>,
}

/// INSERT statement
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    /// Target table name
    pub table_name: String,
    /// Column names (optional; schema order when absent)
    pub columns: Option<Vec<String>>,
    /// Rows to insert
    pub values: Vec<Vec<Literal>>,
}

/// JOIN clause
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    /// Join kind
    pub kind: JoinKind,
    /// Table to join
    pub table: String,
    /// Left side of the ON equality, as written
    pub left: ColumnRef,
    /// Right side of the ON equality, as written
    pub right: ColumnRef,
}

/// SELECT statement
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    /// Selected columns; `None` for `*`
    pub columns: Option<Vec<ColumnRef>>,
    /// Base table
    pub from: String,
    /// Optional JOIN
    pub join: Option<JoinClause>,
    /// WHERE clause (conjunction)
    pub where_clause: Vec<Comparison>,
}

/// Column assignment (for UPDATE)
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// Column name
    pub column: String,
    /// New value
    pub value: Literal,
}

/// UPDATE statement
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    /// Target table name
    pub table_name: String,
    /// SET clause (column = value pairs)
    pub assignments: Vec<Assignment>,
    /// WHERE clause
    pub where_clause: Vec<Comparison>,
}

/// DELETE statement
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    /// Target table name
    pub table_name: String,
    /// WHERE clause
    pub where_clause: Vec<Comparison>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::OnDelete;

    fn column(name: &str, data_type: DataType) -> ColumnDef {
        ColumnDef {
            name: name.to_string(),
            data_type,
            not_null: false,
            primary_key: false,
            unique: false,
            references: None,
        }
    }

    #[test]
    fn test_table_constraints_fold_into_columns() {
        let stmt = CreateTableStatement {
            table_name: "tasks".to_string(),
            columns: vec![
                column("id", DataType::Integer),
                column("user_id", DataType::Integer),
                column("code", DataType::Text),
            ],
            constraints: vec![
                TableConstraint::PrimaryKey("id".to_string()),
                TableConstraint::Unique("code".to_string()),
                TableConstraint::ForeignKey {
                    column: "user_id".to_string(),
                    references: ForeignKey::new("users", "id", OnDelete::Cascade),
                },
            ],
        };

        let def = stmt.to_table_def().unwrap();
        let id = def.get_column("id").unwrap();
        assert!(id.primary_key && !id.nullable);
        assert!(def.get_column("code").unwrap().unique);
        assert_eq!(
            def.get_column("user_id").unwrap().foreign_key,
            Some(ForeignKey::new("users", "id", OnDelete::Cascade))
        );
    }

    #[test]
    fn test_constraint_on_unknown_column() {
        let stmt = CreateTableStatement {
            table_name: "t".to_string(),
            columns: vec![column("a", DataType::Integer)],
            constraints: vec![TableConstraint::PrimaryKey("b".to_string())],
        };
        assert!(matches!(stmt.to_table_def(), Err(Error::Schema(_))));
    }

    #[test]
    fn test_comparison_to_condition() {
        let cmp = Comparison {
            column: ColumnRef::qualified("users", "id"),
            op: CompareOp::Gte,
            value: Literal::Integer(2),
        };
        let cond = cmp.to_condition();
        assert_eq!(cond.column, "users.id");
        assert_eq!(cond.value, Value::Integer(2));
    }
}
