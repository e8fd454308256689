//! Schema definitions for LedgerDB
//!
//! This module defines table schemas, column metadata and foreign keys.

use super::types::DataType;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// What happens to referencing rows when a referenced row is deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OnDelete {
    /// Reject the delete while dependents exist
    #[default]
    Restrict,
    /// Delete dependents along with the referenced row
    Cascade,
}

impl fmt::Display for OnDelete {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OnDelete::Restrict => write!(f, "RESTRICT"),
            OnDelete::Cascade => write!(f, "CASCADE"),
        }
    }
}

/// Foreign key target of a column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Referenced table
    pub table: String,
    /// Referenced column (primary key or unique)
    pub column: String,
    /// Delete policy
    #[serde(default)]
    pub on_delete: OnDelete,
}

impl ForeignKey {
    pub fn new(table: impl Into<String>, column: impl Into<String>, on_delete: OnDelete) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            on_delete,
        }
    }
}

/// Column definition in a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Data type
    pub data_type: DataType,
    /// Column position (0-indexed), assigned by the schema
    #[serde(skip)]
    pub position: usize,
    /// Is this column nullable?
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    /// Is this the primary key?
    #[serde(default)]
    pub primary_key: bool,
    /// Is this column unique?
    #[serde(default)]
    pub unique: bool,
    /// Foreign key target, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<ForeignKey>,
}

fn default_nullable() -> bool {
    true
}

impl Column {
    /// Create a new nullable column without constraints
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            position: 0,
            nullable: true,
            primary_key: false,
            unique: false,
            foreign_key: None,
        }
    }

    /// Set nullable flag
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Set primary key flag
    pub fn primary_key(mut self, pk: bool) -> Self {
        self.primary_key = pk;
        if pk {
            self.nullable = false;
        }
        self
    }

    /// Set unique flag
    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    /// Reference another table's key column
    pub fn references(
        mut self,
        table: impl Into<String>,
        column: impl Into<String>,
        on_delete: OnDelete,
    ) -> Self {
        self.foreign_key = Some(ForeignKey::new(table, column, on_delete));
        self
    }

    /// Does this column get a unique index?
    pub fn is_key(&self) -> bool {
        self.primary_key || self.unique
    }
}

/// Table schema - the ordered columns of a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Column>", into = "Vec<Column>")]
pub struct Schema {
    /// Ordered list of columns
    columns: Vec<Column>,
    /// Column name to index mapping
    name_to_index: HashMap<String, usize>,
}

impl Schema {
    /// Create a new empty schema
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
            name_to_index: HashMap::new(),
        }
    }

    /// Create a schema from a list of columns
    pub fn from_columns(columns: Vec<Column>) -> Self {
        let mut schema = Self::new();
        for col in columns {
            schema.add_column(col);
        }
        schema
    }

    /// Add a column to the schema
    ///
    /// Duplicate names are kept so that `validate` can report them.
    pub fn add_column(&mut self, mut column: Column) {
        column.position = self.columns.len();
        self.name_to_index
            .entry(column.name.clone())
            .or_insert(column.position);
        self.columns.push(column);
    }

    /// Get column by name
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.name_to_index.get(name).map(|&idx| &self.columns[idx])
    }

    /// Get column index by name
    pub fn get_column_index(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    /// Get all columns
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Get number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Check if column exists
    pub fn has_column(&self, name: &str) -> bool {
        self.name_to_index.contains_key(name)
    }

    /// Get the primary key column, if declared
    pub fn primary_key(&self) -> Option<&Column> {
        self.columns.iter().find(|c| c.primary_key)
    }

    /// Columns carrying a foreign key, in declaration order
    pub fn foreign_key_columns(&self) -> impl Iterator<Item = (&Column, &ForeignKey)> {
        self.columns
            .iter()
            .filter_map(|c| c.foreign_key.as_ref().map(|fk| (c, fk)))
    }

    /// Get column names
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Vec<Column>> for Schema {
    fn from(columns: Vec<Column>) -> Self {
        Schema::from_columns(columns)
    }
}

impl From<Schema> for Vec<Column> {
    fn from(schema: Schema) -> Self {
        schema.columns
    }
}

/// Table definition - full table metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDef {
    /// Table name
    pub name: String,
    /// Table schema
    pub schema: Schema,
}

impl TableDef {
    /// Create a new table definition
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }

    /// Get the table name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the table schema
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Get column by name
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.schema.get_column(name)
    }

    /// Check the definition on its own, without looking at other tables
    ///
    /// Foreign key targets are resolved by the database, which can see the
    /// referenced tables.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::Schema("table name must not be empty".to_string()));
        }
        if self.schema.column_count() == 0 {
            return Err(Error::Schema(format!(
                "table '{}' must declare at least one column",
                self.name
            )));
        }

        let mut seen = HashSet::new();
        for col in self.schema.columns() {
            if !seen.insert(col.name.as_str()) {
                return Err(Error::Schema(format!(
                    "column '{}' declared more than once in table '{}'",
                    col.name, self.name
                )));
            }
        }

        let pk_count = self.schema.columns().iter().filter(|c| c.primary_key).count();
        if pk_count > 1 {
            return Err(Error::Schema(format!(
                "table '{}' declares {} primary key columns, at most one is supported",
                self.name, pk_count
            )));
        }
        if let Some(pk) = self.schema.primary_key() {
            if pk.nullable {
                return Err(Error::Schema(format!(
                    "primary key '{}' of table '{}' cannot be nullable",
                    pk.name, self.name
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users_schema() -> Schema {
        Schema::from_columns(vec![
            Column::new("id", DataType::Integer).primary_key(true),
            Column::new("name", DataType::Text).nullable(false),
            Column::new("email", DataType::Text).unique(true),
        ])
    }

    #[test]
    fn test_schema_creation() {
        let schema = users_schema();

        assert_eq!(schema.column_count(), 3);
        assert!(schema.has_column("id"));
        assert!(!schema.has_column("unknown"));
        assert_eq!(schema.get_column_index("email"), Some(2));

        let id_col = schema.get_column("id").unwrap();
        assert!(id_col.primary_key);
        assert!(!id_col.nullable);
        assert_eq!(schema.primary_key().unwrap().name, "id");
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let def = TableDef::new(
            "t",
            Schema::from_columns(vec![
                Column::new("a", DataType::Integer),
                Column::new("a", DataType::Text),
            ]),
        );
        assert!(matches!(def.validate(), Err(Error::Schema(_))));
    }

    #[test]
    fn test_two_primary_keys_rejected() {
        let def = TableDef::new(
            "t",
            Schema::from_columns(vec![
                Column::new("a", DataType::Integer).primary_key(true),
                Column::new("b", DataType::Integer).primary_key(true),
            ]),
        );
        assert!(matches!(def.validate(), Err(Error::Schema(_))));
    }

    #[test]
    fn test_schema_serde_roundtrip_restores_positions() {
        let schema = Schema::from_columns(vec![
            Column::new("id", DataType::Integer).primary_key(true),
            Column::new("user_id", DataType::Integer).references("users", "id", OnDelete::Cascade),
        ]);
        let json = serde_json::to_string(&schema).unwrap();
        let back: Schema = serde_json::from_str(&json).unwrap();

        assert_eq!(back, schema);
        assert_eq!(back.get_column("user_id").unwrap().position, 1);
        let (col, fk) = back.foreign_key_columns().next().unwrap();
        assert_eq!(col.name, "user_id");
        assert_eq!(fk.on_delete, OnDelete::Cascade);
    }
}
