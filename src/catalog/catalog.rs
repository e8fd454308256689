//! System Catalog for LedgerDB
//!
//! The catalog is the set of live tables plus the schema version. It is the
//! only place that sees every table at once, so foreign keys, cascades and
//! drop dependencies are checked here.
//!
//! Tables are shared behind `Arc`: cloning a catalog is cheap, and a
//! mutation on the clone copies only the tables it touches. The database
//! applies every statement to a clone and publishes it once it is saved.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use super::schema::{Column, OnDelete, Schema, TableDef};
use super::types::DataType;
use crate::error::{Error, Result};
use crate::storage::{Condition, JoinKind, ResultSet, Row, RowId, Table, Tuple, Value};

/// A foreign key pointing at some table, seen from the referenced side
#[derive(Debug, Clone)]
struct Dependent {
    /// Referencing table
    table: String,
    /// Referencing column position
    column: usize,
    /// Referenced column position
    target: usize,
    on_delete: OnDelete,
}

/// System Catalog - the live tables of a database
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    /// Tables by name, in creation order
    tables: IndexMap<String, Arc<Table>>,
    /// Bumped by every schema change
    schema_version: u64,
}

impl Catalog {
    /// Create a new empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Assemble a catalog from restored tables
    pub fn from_tables(tables: IndexMap<String, Table>, schema_version: u64) -> Self {
        Self {
            tables: tables
                .into_iter()
                .map(|(name, table)| (name, Arc::new(table)))
                .collect(),
            schema_version,
        }
    }

    /// Current schema version
    pub fn schema_version(&self) -> u64 {
        self.schema_version
    }

    /// Get a table by name
    pub fn get_table(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(name)
            .map(|t| t.as_ref())
            .ok_or_else(|| Error::TableNotFound(name.to_string()))
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut Table> {
        self.tables
            .get_mut(name)
            .map(Arc::make_mut)
            .ok_or_else(|| Error::TableNotFound(name.to_string()))
    }

    /// Check if a table exists
    pub fn table_exists(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// List all table names, in creation order
    pub fn list_tables(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    /// All tables, in creation order
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values().map(|t| t.as_ref())
    }

    // ========== Schema Changes ==========

    /// Create a new table
    ///
    /// Foreign keys must target the primary key or a unique column of an
    /// existing table (or of the table itself) with a matching type.
    pub fn create_table(&mut self, def: TableDef) -> Result<()> {
        if self.tables.contains_key(def.name()) {
            return Err(Error::TableAlreadyExists(def.name().to_string()));
        }
        def.validate()?;

        for (col, fk) in def.schema.foreign_key_columns() {
            let target_schema: &Schema = if fk.table == def.name {
                &def.schema
            } else {
                self.tables
                    .get(&fk.table)
                    .map(|t| t.schema())
                    .ok_or_else(|| {
                        Error::Schema(format!(
                            "foreign key '{}' references missing table '{}'",
                            col.name, fk.table
                        ))
                    })?
            };
            let target = target_schema.get_column(&fk.column).ok_or_else(|| {
                Error::Schema(format!(
                    "foreign key '{}' references missing column {}.{}",
                    col.name, fk.table, fk.column
                ))
            })?;
            check_key_target(col, target, &fk.table)?;
        }

        debug!(table = def.name(), columns = def.schema.column_count(), "table created");
        self.tables
            .insert(def.name.clone(), Arc::new(Table::new(def)));
        self.schema_version += 1;
        Ok(())
    }

    /// Drop a set of tables at once
    ///
    /// Fails if a table outside the set references one inside it.
    pub fn drop_tables(&mut self, names: &[String]) -> Result<()> {
        let doomed: HashSet<&str> = names.iter().map(String::as_str).collect();
        for name in &doomed {
            if !self.tables.contains_key(*name) {
                return Err(Error::TableNotFound(name.to_string()));
            }
        }

        for table in self.tables.values() {
            if doomed.contains(table.name()) {
                continue;
            }
            if let Some((col, fk)) = table
                .schema()
                .foreign_key_columns()
                .find(|(_, fk)| doomed.contains(fk.table.as_str()))
            {
                return Err(Error::ReferentialIntegrity(format!(
                    "cannot drop '{}': referenced by {}.{}",
                    fk.table,
                    table.name(),
                    col.name
                )));
            }
        }

        self.tables.retain(|name, _| !doomed.contains(name.as_str()));
        self.schema_version += 1;
        debug!(tables = ?names, "tables dropped");
        Ok(())
    }

    // ========== Reads ==========

    /// Rows of `table` matching every condition
    pub fn select(&self, table: &str, predicate: &[Condition]) -> Result<ResultSet> {
        self.get_table(table)?.select(predicate)
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
        let left = self.get_table(left)?;
        let right = self.get_table(right)?;
        left.join(right, left_column, right_column, kind)
    }

    // ========== Row Changes ==========

    /// Insert rows, all or nothing
    ///
    /// Each row is checked for types, then key uniqueness, then foreign
    /// keys, and sees the rows inserted before it.
    pub fn insert(&mut self, table: &str, rows: &[Row]) -> Result<Vec<RowId>> {
        let mut ids = Vec::with_capacity(rows.len());
        for row in rows {
            let t = self.get_table(table)?;
            let tuple = t.prepare_row(row)?;
            t.check_unique(&tuple, None)?;
            self.check_references(t, &tuple)?;
            ids.push(self.table_mut(table)?.insert_tuple(tuple));
        }
        Ok(ids)
    }

    /// Apply `changes` to every row matching `predicate`, all or nothing
    pub fn update(&mut self, table: &str, changes: &Row, predicate: &[Condition]) -> Result<usize> {
        let t = self.get_table(table)?;
        let changes = t.prepare_changes(changes)?;
        let ids = t.select_ids(predicate)?;
        let planned = t.plan_update(&ids, &changes)?;

        let changed: HashSet<usize> = changes.iter().map(|(pos, _)| *pos).collect();
        let touches_fk = t
            .schema()
            .foreign_key_columns()
            .any(|(col, _)| changed.contains(&col.position));

        let staged: HashMap<RowId, &Tuple> = planned.iter().map(|(id, t)| (*id, t)).collect();
        for (id, new) in &planned {
            if touches_fk {
                self.check_updated_references(t, new, &staged)?;
            }
            if let Some(old) = t.get_row(*id) {
                self.check_key_change(t, old, new, &changed, &staged)?;
            }
        }

        let count = planned.len();
        let t = self.table_mut(table)?;
        for (id, tuple) in planned {
            t.replace_tuple(id, tuple);
        }
        Ok(count)
    }

    /// Delete every row matching `predicate`, following delete policies
    ///
    /// CASCADE dependents are deleted along with their parents, transitively.
    /// A RESTRICT dependent that is not itself being deleted fails the whole
    /// delete. Returns the number of rows matched in `table`.
    pub fn delete(&mut self, table: &str, predicate: &[Condition]) -> Result<usize> {
        let matched = self.get_table(table)?.select_ids(predicate)?;
        let doomed = self.deletion_closure(table, &matched)?;

        let cascaded: usize = doomed
            .iter()
            .filter(|(name, _)| name.as_str() != table)
            .map(|(_, ids)| ids.len())
            .sum();
        if cascaded > 0 {
            debug!(table, cascaded, "cascading delete");
        }

        for (name, ids) in doomed {
            let t = self.table_mut(&name)?;
            for id in ids {
                t.remove_row(id);
            }
        }
        Ok(matched.len())
    }

    /// Every row that goes away when `ids` of `table` are deleted
    fn deletion_closure(
        &self,
        table: &str,
        ids: &[RowId],
    ) -> Result<HashMap<String, BTreeSet<RowId>>> {
        let mut doomed: HashMap<String, BTreeSet<RowId>> = HashMap::new();
        let mut queue: VecDeque<(String, RowId)> = VecDeque::new();
        for &id in ids {
            if doomed.entry(table.to_string()).or_default().insert(id) {
                queue.push_back((table.to_string(), id));
            }
        }

        let mut restricted: Vec<(String, RowId, String)> = Vec::new();
        let mut dependents_cache: HashMap<String, Vec<Dependent>> = HashMap::new();

        while let Some((name, id)) = queue.pop_front() {
            let parent = self.get_table(&name)?;
            let Some(tuple) = parent.get_row(id) else {
                continue;
            };

            let dependents = dependents_cache
                .entry(name.clone())
                .or_insert_with(|| self.dependents_of(&name));

            for dep in dependents.iter() {
                let key = &tuple.values()[dep.target];
                if key.is_null() {
                    continue;
                }
                let child = self.get_table(&dep.table)?;
                for child_id in child.rows_with_key(dep.column, key) {
                    let already = doomed
                        .get(&dep.table)
                        .map(|set| set.contains(&child_id))
                        .unwrap_or(false);
                    if already {
                        continue;
                    }
                    match dep.on_delete {
                        OnDelete::Cascade => {
                            doomed.entry(dep.table.clone()).or_default().insert(child_id);
                            queue.push_back((dep.table.clone(), child_id));
                        }
                        OnDelete::Restrict => {
                            restricted.push((dep.table.clone(), child_id, name.clone()))
                        }
                    }
                }
            }
        }

        // a restricted row may still be removed through another cascade path
        for (child, child_id, parent) in restricted {
            let removed = doomed
                .get(&child)
                .map(|set| set.contains(&child_id))
                .unwrap_or(false);
            if !removed {
                return Err(Error::ReferentialIntegrity(format!(
                    "cannot delete from '{}': rows in '{}' still reference it",
                    parent, child
                )));
            }
        }

        Ok(doomed)
    }

    /// Foreign keys in any table that reference `table`
    fn dependents_of(&self, table: &str) -> Vec<Dependent> {
        let Some(parent) = self.tables.get(table) else {
            return Vec::new();
        };
        self.tables
            .values()
            .flat_map(|child| {
                child
                    .schema()
                    .foreign_key_columns()
                    .filter(|(_, fk)| fk.table == table)
                    .filter_map(|(col, fk)| {
                        let target = parent.schema().get_column_index(&fk.column)?;
                        Some(Dependent {
                            table: child.name().to_string(),
                            column: col.position,
                            target,
                            on_delete: fk.on_delete,
                        })
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Every non-null foreign key of `tuple` must resolve
    ///
    /// A self-referencing row may point at itself.
    fn check_references(&self, table: &Table, tuple: &Tuple) -> Result<()> {
        for (col, fk) in table.schema().foreign_key_columns() {
            let key = &tuple.values()[col.position];
            if key.is_null() {
                continue;
            }
            let target = self.get_table(&fk.table)?;
            let target_pos = target.column(&fk.column)?.position;

            let own_key = fk.table == table.name() && tuple.values()[target_pos] == *key;
            if !own_key && !target.contains_key(target_pos, key) {
                return Err(dangling(table.name(), col, key, &fk.table, &fk.column));
            }
        }
        Ok(())
    }

    /// Like `check_references`, but self references resolve against the
    /// table as it will be once the update is applied
    fn check_updated_references(
        &self,
        table: &Table,
        tuple: &Tuple,
        staged: &HashMap<RowId, &Tuple>,
    ) -> Result<()> {
        for (col, fk) in table.schema().foreign_key_columns() {
            let key = &tuple.values()[col.position];
            if key.is_null() {
                continue;
            }
            let target = self.get_table(&fk.table)?;
            let target_pos = target.column(&fk.column)?.position;

            let resolves = if fk.table == table.name() {
                staged.values().any(|t| t.values()[target_pos] == *key)
                    || target
                        .rows_with_key(target_pos, key)
                        .iter()
                        .any(|id| !staged.contains_key(id))
            } else {
                target.contains_key(target_pos, key)
            };
            if !resolves {
                return Err(dangling(table.name(), col, key, &fk.table, &fk.column));
            }
        }
        Ok(())
    }

    /// A referenced key may not change while rows still point at it
    ///
    /// Rows of a self-referencing table that the same update rewrites are
    /// judged by their new contents.
    fn check_key_change(
        &self,
        table: &Table,
        old: &Tuple,
        new: &Tuple,
        changed: &HashSet<usize>,
        staged: &HashMap<RowId, &Tuple>,
    ) -> Result<()> {
        for dep in self.dependents_of(table.name()) {
            if !changed.contains(&dep.target) {
                continue;
            }
            let (old_key, new_key) = (&old.values()[dep.target], &new.values()[dep.target]);
            if old_key == new_key || old_key.is_null() {
                continue;
            }
            let self_ref = dep.table == table.name();
            if self_ref && staged.values().any(|t| t.values()[dep.target] == *old_key) {
                continue;
            }

            let child = self.get_table(&dep.table)?;
            let referenced = child.rows_with_key(dep.column, old_key).iter().any(|id| {
                match staged.get(id).filter(|_| self_ref) {
                    Some(t) => t.values()[dep.column] == *old_key,
                    None => true,
                }
            });
            if referenced {
                return Err(Error::ReferentialIntegrity(format!(
                    "cannot change {}.{} from {}: still referenced by '{}'",
                    table.name(),
                    table.schema().columns()[dep.target].name,
                    old_key,
                    dep.table
                )));
            }
        }
        Ok(())
    }

    /// Get table schema info as a formatted string (for .schema command)
    pub fn get_table_info(&self, name: &str) -> Result<String> {
        let table = self.get_table(name)?;
        let mut info = format!("Table: {}\n", table.name());
        info.push_str("Columns:\n");

        for col in table.schema().columns() {
            let mut flags = Vec::new();
            if col.primary_key {
                flags.push("PRIMARY KEY".to_string());
            }
            if !col.nullable && !col.primary_key {
                flags.push("NOT NULL".to_string());
            }
            if col.unique {
                flags.push("UNIQUE".to_string());
            }
            if let Some(fk) = &col.foreign_key {
                flags.push(format!(
                    "REFERENCES {}({}) ON DELETE {}",
                    fk.table, fk.column, fk.on_delete
                ));
            }

            let flags_str = if flags.is_empty() {
                String::new()
            } else {
                format!(" [{}]", flags.join(", "))
            };

            info.push_str(&format!("  {} {}{}\n", col.name, col.data_type, flags_str));
        }

        let description = table.describe();
        if !description.indexed_columns.is_empty() {
            info.push_str(&format!(
                "Indexes: {}\n",
                description.indexed_columns.join(", ")
            ));
        }
        info.push_str(&format!("Rows: {}\n", description.row_count));

        Ok(info)
    }
}

fn check_key_target(col: &Column, target: &Column, target_table: &str) -> Result<()> {
    if !target.is_key() {
        return Err(Error::Schema(format!(
            "foreign key '{}' must reference a primary key or unique column, {}.{} is neither",
            col.name, target_table, target.name
        )));
    }
    if col.data_type != target.data_type {
        return Err(Error::Schema(format!(
            "foreign key '{}' is {} but {}.{} is {}",
            col.name, col.data_type, target_table, target.name, target.data_type
        )));
    }
    Ok(())
}

fn dangling(table: &str, col: &Column, key: &Value, target: &str, target_col: &str) -> Error {
    Error::ReferentialIntegrity(format!(
        "{}.{} = {} has no matching row in {}.{}",
        table, col.name, key, target, target_col
    ))
}

/// Builder for creating tables with a fluent API
pub struct TableBuilder {
    name: String,
    columns: Vec<Column>,
}

impl TableBuilder {
    /// Start building a new table
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Add a column
    pub fn column(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.columns.push(Column::new(name, data_type));
        self
    }

    /// Add a fully configured column
    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Add a primary key column (INTEGER PRIMARY KEY)
    pub fn primary_key(mut self, name: impl Into<String>) -> Self {
        self.columns
            .push(Column::new(name, DataType::Integer).primary_key(true));
        self
    }

    /// Add a NOT NULL column
    pub fn column_not_null(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.columns
            .push(Column::new(name, data_type).nullable(false));
        self
    }

    /// Add an INTEGER column referencing `table(column)`
    pub fn foreign_key(
        mut self,
        name: impl Into<String>,
        table: impl Into<String>,
        column: impl Into<String>,
        on_delete: OnDelete,
    ) -> Self {
        self.columns
            .push(Column::new(name, DataType::Integer).references(table, column, on_delete));
        self
    }

    /// Finish the definition
    pub fn build(self) -> TableDef {
        TableDef::new(self.name, Schema::from_columns(self.columns))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{row, CompareOp};

    fn users_def() -> TableDef {
        TableBuilder::new("users")
            .primary_key("id")
            .column_not_null("name", DataType::Text)
            .build()
    }

    fn tasks_def(on_delete: OnDelete) -> TableDef {
        TableBuilder::new("tasks")
            .primary_key("id")
            .foreign_key("user_id", "users", "id", on_delete)
            .column("title", DataType::Text)
            .build()
    }

    fn catalog(on_delete: OnDelete) -> Catalog {
        let mut catalog = Catalog::new();
        catalog.create_table(users_def()).unwrap();
        catalog.create_table(tasks_def(on_delete)).unwrap();
        catalog
            .insert(
                "users",
                &[
                    row([("id", Value::from(1)), ("name", Value::from("John"))]),
                    row([("id", Value::from(2)), ("name", Value::from("Jane"))]),
                ],
            )
            .unwrap();
        catalog
            .insert(
                "tasks",
                &[
                    row([("id", Value::from(1)), ("user_id", Value::from(1))]),
                    row([("id", Value::from(2)), ("user_id", Value::from(1))]),
                    row([("id", Value::from(3)), ("user_id", Value::from(2))]),
                ],
            )
            .unwrap();
        catalog
    }

    #[test]
    fn test_create_and_get_table() {
        let mut catalog = Catalog::new();
        catalog.create_table(users_def()).unwrap();

        let table = catalog.get_table("users").unwrap();
        assert_eq!(table.name(), "users");
        assert_eq!(table.schema().column_count(), 2);
        assert_eq!(catalog.schema_version(), 1);
        assert!(matches!(
            catalog.get_table("nope"),
            Err(Error::TableNotFound(_))
        ));
    }

    #[test]
    fn test_table_already_exists() {
        let mut catalog = Catalog::new();
        catalog.create_table(users_def()).unwrap();

        let result = catalog.create_table(users_def());
        assert!(matches!(result, Err(Error::TableAlreadyExists(_))));
        assert_eq!(catalog.schema_version(), 1);
    }

    #[test]
    fn test_foreign_key_targets_are_checked() {
        let mut catalog = Catalog::new();
        assert!(matches!(
            catalog.create_table(tasks_def(OnDelete::Cascade)),
            Err(Error::Schema(_))
        ));

        catalog.create_table(users_def()).unwrap();
        let bad_target = TableBuilder::new("notes")
            .foreign_key("author", "users", "name", OnDelete::Restrict)
            .build();
        assert!(matches!(catalog.create_table(bad_target), Err(Error::Schema(_))));

        let self_ref = TableBuilder::new("employees")
            .primary_key("id")
            .foreign_key("manager_id", "employees", "id", OnDelete::Restrict)
            .build();
        catalog.create_table(self_ref).unwrap();
    }

    #[test]
    fn test_insert_checks_references() {
        let mut catalog = catalog(OnDelete::Cascade);
        let err = catalog
            .insert("tasks", &[row([("id", Value::from(9)), ("user_id", Value::from(42))])])
            .unwrap_err();
        assert!(matches!(err, Error::ReferentialIntegrity(_)));

        // NULL references are allowed on nullable columns
        catalog
            .insert("tasks", &[row([("id", Value::from(9)), ("user_id", Value::Null)])])
            .unwrap();
    }

    #[test]
    fn test_self_reference_may_point_at_itself() {
        let mut catalog = Catalog::new();
        catalog
            .create_table(
                TableBuilder::new("employees")
                    .primary_key("id")
                    .foreign_key("manager_id", "employees", "id", OnDelete::Restrict)
                    .build(),
            )
            .unwrap();
        catalog
            .insert(
                "employees",
                &[
                    row([("id", Value::from(1)), ("manager_id", Value::from(1))]),
                    row([("id", Value::from(2)), ("manager_id", Value::from(1))]),
                ],
            )
            .unwrap();
        assert_eq!(catalog.get_table("employees").unwrap().len(), 2);
    }

    #[test]
    fn test_cascade_delete() {
        let mut catalog = catalog(OnDelete::Cascade);
        let deleted = catalog.delete("users", &[Condition::eq("id", 1)]).unwrap();

        assert_eq!(deleted, 1);
        let tasks = catalog.select("tasks", &[]).unwrap();
        assert_eq!(tasks.column_values("id").unwrap(), vec![&Value::from(3)]);
    }

    #[test]
    fn test_restrict_delete() {
        let mut catalog = catalog(OnDelete::Restrict);
        let err = catalog.delete("users", &[Condition::eq("id", 1)]).unwrap_err();
        assert!(matches!(err, Error::ReferentialIntegrity(_)));
        assert_eq!(catalog.get_table("users").unwrap().len(), 2);

        catalog.delete("tasks", &[Condition::eq("user_id", 1)]).unwrap();
        catalog.delete("users", &[Condition::eq("id", 1)]).unwrap();
        assert_eq!(catalog.get_table("users").unwrap().len(), 1);
    }

    #[test]
    fn test_restrict_satisfied_within_delete_set() {
        let mut catalog = Catalog::new();
        catalog
            .create_table(
                TableBuilder::new("nodes")
                    .primary_key("id")
                    .foreign_key("parent", "nodes", "id", OnDelete::Restrict)
                    .build(),
            )
            .unwrap();
        catalog
            .insert(
                "nodes",
                &[
                    row([("id", Value::from(1))]),
                    row([("id", Value::from(2)), ("parent", Value::from(1))]),
                ],
            )
            .unwrap();

        // the only dependent of node 1 is deleted too
        assert_eq!(catalog.delete("nodes", &[]).unwrap(), 2);
    }

    #[test]
    fn test_cascade_cycle_terminates() {
        let mut catalog = Catalog::new();
        catalog
            .create_table(
                TableBuilder::new("ring")
                    .primary_key("id")
                    .foreign_key("next", "ring", "id", OnDelete::Cascade)
                    .build(),
            )
            .unwrap();
        catalog
            .insert(
                "ring",
                &[
                    row([("id", Value::from(1)), ("next", Value::from(1))]),
                    row([("id", Value::from(2)), ("next", Value::from(1))]),
                    row([("id", Value::from(3)), ("next", Value::from(2))]),
                ],
            )
            .unwrap();

        catalog.delete("ring", &[Condition::eq("id", 1)]).unwrap();
        assert!(catalog.get_table("ring").unwrap().is_empty());
    }

    #[test]
    fn test_update_rejects_referenced_key_change() {
        let mut catalog = catalog(OnDelete::Cascade);
        let err = catalog
            .update("users", &row([("id", Value::from(10))]), &[Condition::eq("id", 1)])
            .unwrap_err();
        assert!(matches!(err, Error::ReferentialIntegrity(_)));

        // unreferenced rows may change their key
        catalog.delete("tasks", &[Condition::eq("user_id", 2)]).unwrap();
        catalog
            .update("users", &row([("id", Value::from(20))]), &[Condition::eq("id", 2)])
            .unwrap();
    }

    #[test]
    fn test_update_checks_new_references() {
        let mut catalog = catalog(OnDelete::Cascade);
        let err = catalog
            .update("tasks", &row([("user_id", Value::from(99))]), &[])
            .unwrap_err();
        assert!(matches!(err, Error::ReferentialIntegrity(_)));

        let moved = catalog
            .update(
                "tasks",
                &row([("user_id", Value::from(2))]),
                &[Condition::new("id", CompareOp::Lte, 2)],
            )
            .unwrap();
        assert_eq!(moved, 2);
    }

    fn nodes() -> Catalog {
        let mut catalog = Catalog::new();
        catalog
            .create_table(
                TableBuilder::new("nodes")
                    .primary_key("id")
                    .foreign_key("parent", "nodes", "id", OnDelete::Restrict)
                    .build(),
            )
            .unwrap();
        catalog
            .insert("nodes", &[row([("id", Value::from(1)), ("parent", Value::Null)])])
            .unwrap();
        catalog
    }

    #[test]
    fn test_update_cannot_point_at_key_it_moves_away() {
        let mut catalog = nodes();
        let err = catalog
            .update(
                "nodes",
                &row([("id", Value::from(5)), ("parent", Value::from(1))]),
                &[Condition::eq("id", 1)],
            )
            .unwrap_err();
        assert!(matches!(err, Error::ReferentialIntegrity(_)));

        let rows = catalog.select("nodes", &[]).unwrap();
        assert_eq!(rows.rows[0].values(), &[Value::from(1), Value::Null]);

        // pointing at the new key is fine
        catalog
            .update(
                "nodes",
                &row([("id", Value::from(5)), ("parent", Value::from(5))]),
                &[Condition::eq("id", 1)],
            )
            .unwrap();
        let rows = catalog.select("nodes", &[]).unwrap();
        assert_eq!(rows.rows[0].values(), &[Value::from(5), Value::from(5)]);
    }

    #[test]
    fn test_self_referencing_row_may_move_with_its_reference() {
        let mut catalog = nodes();
        catalog
            .update("nodes", &row([("parent", Value::from(1))]), &[])
            .unwrap();

        // the only row still pointing at 1 is the one being rewritten
        catalog
            .update(
                "nodes",
                &row([("id", Value::from(7)), ("parent", Value::from(7))]),
                &[Condition::eq("id", 1)],
            )
            .unwrap();

        let err = catalog
            .update("nodes", &row([("id", Value::from(8))]), &[Condition::eq("id", 7)])
            .unwrap_err();
        assert!(matches!(err, Error::ReferentialIntegrity(_)));
    }

    fn comments_catalog(comments_on_delete: OnDelete) -> Catalog {
        let mut catalog = catalog(OnDelete::Cascade);
        catalog
            .create_table(
                TableBuilder::new("comments")
                    .primary_key("id")
                    .foreign_key("task_id", "tasks", "id", comments_on_delete)
                    .build(),
            )
            .unwrap();
        catalog
            .insert(
                "comments",
                &[
                    row([("id", Value::from(1)), ("task_id", Value::from(1))]),
                    row([("id", Value::from(2)), ("task_id", Value::from(2))]),
                    row([("id", Value::from(3)), ("task_id", Value::from(3))]),
                ],
            )
            .unwrap();
        catalog
    }

    #[test]
    fn test_cascade_crosses_tables() {
        let mut catalog = comments_catalog(OnDelete::Cascade);
        assert_eq!(catalog.delete("users", &[Condition::eq("id", 1)]).unwrap(), 1);

        let tasks = catalog.select("tasks", &[]).unwrap();
        assert_eq!(tasks.column_values("id").unwrap(), vec![&Value::from(3)]);
        let comments = catalog.select("comments", &[]).unwrap();
        assert_eq!(comments.column_values("id").unwrap(), vec![&Value::from(3)]);
    }

    #[test]
    fn test_restrict_grandchild_blocks_cascade() {
        let mut catalog = comments_catalog(OnDelete::Restrict);
        let err = catalog.delete("users", &[Condition::eq("id", 1)]).unwrap_err();
        assert!(matches!(err, Error::ReferentialIntegrity(_)));

        assert_eq!(catalog.get_table("users").unwrap().len(), 2);
        assert_eq!(catalog.get_table("tasks").unwrap().len(), 3);
        assert_eq!(catalog.get_table("comments").unwrap().len(), 3);
    }

    #[test]
    fn test_drop_tables() {
        let mut catalog = catalog(OnDelete::Cascade);
        let err = catalog.drop_tables(&["users".to_string()]).unwrap_err();
        assert!(matches!(err, Error::ReferentialIntegrity(_)));

        catalog
            .drop_tables(&["users".to_string(), "tasks".to_string()])
            .unwrap();
        assert!(catalog.list_tables().is_empty());
        assert_eq!(catalog.schema_version(), 3);
    }

    #[test]
    fn test_clone_is_copy_on_write() {
        let live = catalog(OnDelete::Cascade);
        let mut working = live.clone();
        working
            .insert("users", &[row([("id", Value::from(3)), ("name", Value::from("Ann"))])])
            .unwrap();

        assert_eq!(live.get_table("users").unwrap().len(), 2);
        assert_eq!(working.get_table("users").unwrap().len(), 3);
        assert!(!Arc::ptr_eq(&live.tables["users"], &working.tables["users"]));
        assert!(Arc::ptr_eq(&live.tables["tasks"], &working.tables["tasks"]));
    }

    #[test]
    fn test_table_info() {
        let catalog = catalog(OnDelete::Cascade);
        let info = catalog.get_table_info("tasks").unwrap();
        assert!(info.contains("user_id INTEGER [REFERENCES users(id) ON DELETE CASCADE]"));
        assert!(info.contains("Rows: 3"));
    }
}
