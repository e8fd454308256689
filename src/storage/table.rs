//! Table storage for LedgerDB
//!
//! A table holds its definition, its rows in insertion order and one hash
//! index per key or foreign-key column. Checks that need other tables
//! (foreign keys, cascades) live in the database; the table offers the
//! single-table pieces they are built from.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use super::index::{Index, RowId};
use super::predicate::{self, CompareOp, Condition};
use super::result::{ResultSet, Row};
use super::value::{Tuple, Value};
use crate::catalog::{Column, DataType, Schema, TableDef};
use crate::error::{Error, Result};

/// Join kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinKind {
    #[default]
    Inner,
    Left,
    Right,
}

impl fmt::Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinKind::Inner => write!(f, "INNER"),
            JoinKind::Left => write!(f, "LEFT"),
            JoinKind::Right => write!(f, "RIGHT"),
        }
    }
}

/// A predicate conjunct resolved against the schema
#[derive(Debug, Clone)]
struct BoundCondition {
    column: usize,
    op: CompareOp,
    value: Value,
}

impl BoundCondition {
    fn matches(&self, tuple: &Tuple) -> bool {
        tuple
            .get(self.column)
            .map(|cell| predicate::matches(cell, self.op, &self.value))
            .unwrap_or(false)
    }
}

/// Summary of a table for `describe`
#[derive(Debug, Clone, Serialize)]
pub struct TableDescription {
    pub name: String,
    pub columns: Vec<Column>,
    pub primary_key: Option<String>,
    pub row_count: usize,
    pub indexed_columns: Vec<String>,
}

/// A typed, constrained collection of rows
#[derive(Debug, Clone)]
pub struct Table {
    /// Table definition (metadata)
    def: TableDef,
    /// Rows keyed by row id, in insertion order
    rows: IndexMap<RowId, Tuple>,
    /// Indexes by column position
    indexes: BTreeMap<usize, Index>,
    /// Next row id to hand out
    next_row_id: RowId,
}

impl Table {
    /// Create an empty table
    ///
    /// Every primary-key and unique column gets a unique index, every
    /// foreign-key column a reverse-lookup index.
    pub fn new(def: TableDef) -> Self {
        let indexes = def
            .schema
            .columns()
            .iter()
            .filter(|c| c.is_key() || c.foreign_key.is_some())
            .map(|c| (c.position, Index::new(c.position, c.is_key())))
            .collect();

        Self {
            def,
            rows: IndexMap::new(),
            indexes,
            next_row_id: 0,
        }
    }

    /// Rebuild a table from stored rows, checking key uniqueness
    pub(crate) fn restore(def: TableDef, rows: Vec<Tuple>) -> Result<Self> {
        let mut table = Table::new(def);
        for tuple in rows {
            table.check_unique(&tuple, None)?;
            table.insert_tuple(tuple);
        }
        Ok(table)
    }

    /// Get table name
    pub fn name(&self) -> &str {
        self.def.name()
    }

    /// Get table schema
    pub fn schema(&self) -> &Schema {
        self.def.schema()
    }

    /// Get table definition
    pub fn definition(&self) -> &TableDef {
        &self.def
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows with their ids, in insertion order
    pub fn rows(&self) -> impl Iterator<Item = (RowId, &Tuple)> {
        self.rows.iter().map(|(id, t)| (*id, t))
    }

    /// Get a row by id
    pub fn get_row(&self, id: RowId) -> Option<&Tuple> {
        self.rows.get(&id)
    }

    /// Resolve a column by name, accepting `table.column` for this table
    pub fn column(&self, name: &str) -> Result<&Column> {
        let bare = name
            .strip_prefix(self.name())
            .and_then(|rest| rest.strip_prefix('.'))
            .unwrap_or(name);
        self.schema()
            .get_column(bare)
            .ok_or_else(|| Error::ColumnNotFound(name.to_string(), self.name().to_string()))
    }

    /// Column names qualified as `table.column`
    pub fn qualified_columns(&self) -> Vec<String> {
        self.schema()
            .columns()
            .iter()
            .map(|c| format!("{}.{}", self.name(), c.name))
            .collect()
    }

    /// Is there an index on the column at `position`?
    pub fn is_indexed(&self, position: usize) -> bool {
        self.indexes.contains_key(&position)
    }

    // ========== Validation ==========

    /// Type-check a row against the schema
    ///
    /// Unknown columns are rejected, omitted columns become NULL and every
    /// value is coerced to its declared type.
    pub fn prepare_row(&self, row: &Row) -> Result<Tuple> {
        for name in row.keys() {
            if !self.schema().has_column(name) {
                return Err(Error::ColumnNotFound(name.clone(), self.name().to_string()));
            }
        }

        self.schema()
            .columns()
            .iter()
            .map(|col| {
                let raw = row.get(&col.name).cloned().unwrap_or(Value::Null);
                check_value(col, raw)
            })
            .collect()
    }

    /// Type-check a set of column changes for an update
    pub fn prepare_changes(&self, changes: &Row) -> Result<Vec<(usize, Value)>> {
        changes
            .iter()
            .map(|(name, value)| {
                let col = self.column(name)?;
                Ok((col.position, check_value(col, value.clone())?))
            })
            .collect()
    }

    /// Check primary-key and unique columns of `tuple` against stored rows
    ///
    /// Unique indexes are keyed by column position, so columns are checked
    /// in declaration order and the first collision is reported. `except`
    /// names the row being replaced, if any.
    pub fn check_unique(&self, tuple: &Tuple, except: Option<RowId>) -> Result<()> {
        for index in self.indexes.values().filter(|i| i.is_unique()) {
            let key = &tuple.values()[index.column()];
            if index.conflicts(key, except) {
                let col = &self.schema().columns()[index.column()];
                return Err(self.duplicate_key(col, key));
            }
        }
        Ok(())
    }

    fn duplicate_key(&self, col: &Column, key: &Value) -> Error {
        let kind = if col.primary_key { "primary key" } else { "unique column" };
        Error::ConstraintViolation(format!(
            "duplicate value {} for {} '{}' in table '{}'",
            key,
            kind,
            col.name,
            self.name()
        ))
    }

    /// Does any row hold `key` in the column at `position`?
    pub fn contains_key(&self, position: usize, key: &Value) -> bool {
        if key.is_null() {
            return false;
        }
        match self.indexes.get(&position) {
            Some(index) => index.contains(key),
            None => self.rows.values().any(|t| t.values()[position] == *key),
        }
    }

    /// Rows holding `key` in the column at `position`, in insertion order
    pub fn rows_with_key(&self, position: usize, key: &Value) -> Vec<RowId> {
        if key.is_null() {
            return Vec::new();
        }
        match self.indexes.get(&position) {
            Some(index) => index.get(key).collect(),
            None => self
                .rows
                .iter()
                .filter(|(_, t)| t.values()[position] == *key)
                .map(|(id, _)| *id)
                .collect(),
        }
    }

    // ========== Queries ==========

    fn bind_predicate(&self, predicate: &[Condition]) -> Result<Vec<BoundCondition>> {
        predicate
            .iter()
            .map(|cond| {
                let col = self.column(&cond.column)?;
                Ok(BoundCondition {
                    column: col.position,
                    op: cond.op,
                    value: bind_value(col, &cond.value)?,
                })
            })
            .collect()
    }

    /// Ids of rows matching every condition, in insertion order
    ///
    /// An equality on an indexed column narrows the candidates through the
    /// index; candidates are always re-checked against the full predicate.
    pub fn select_ids(&self, predicate: &[Condition]) -> Result<Vec<RowId>> {
        let bound = self.bind_predicate(predicate)?;

        let probe = bound.iter().find_map(|c| match c.op {
            CompareOp::Eq if !c.value.is_null() => {
                self.indexes.get(&c.column).map(|index| (index, &c.value))
            }
            _ => None,
        });

        let ids = match probe {
            Some((index, key)) => index
                .get(key)
                .filter(|id| {
                    self.rows
                        .get(id)
                        .map(|t| bound.iter().all(|c| c.matches(t)))
                        .unwrap_or(false)
                })
                .collect(),
            None => self.scan(&bound),
        };
        Ok(ids)
    }

    /// Ids of rows matching every condition, always by full scan
    pub fn scan_ids(&self, predicate: &[Condition]) -> Result<Vec<RowId>> {
        let bound = self.bind_predicate(predicate)?;
        Ok(self.scan(&bound))
    }

    fn scan(&self, bound: &[BoundCondition]) -> Vec<RowId> {
        self.rows
            .iter()
            .filter(|(_, t)| bound.iter().all(|c| c.matches(t)))
            .map(|(id, _)| *id)
            .collect()
    }

    /// Rows matching every condition, in insertion order
    pub fn select(&self, predicate: &[Condition]) -> Result<ResultSet> {
        let rows = self
            .select_ids(predicate)?
            .into_iter()
            .filter_map(|id| self.rows.get(&id).cloned())
            .collect();
        let columns = self
            .schema()
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();
        Ok(ResultSet::new(columns, rows))
    }

    /// Number of rows matching every condition
    pub fn count(&self, predicate: &[Condition]) -> Result<usize> {
        Ok(self.select_ids(predicate)?.len())
    }

    /// Hash join with `other` on `local_column = other_column`
    ///
    /// Output columns are `table.column`, this table's first. The probe side
    /// drives row order: this table for INNER and LEFT, `other` for RIGHT.
    /// NULL keys never match.
    pub fn join(
        &self,
        other: &Table,
        local_column: &str,
        other_column: &str,
        kind: JoinKind,
    ) -> Result<ResultSet> {
        let left = self.column(local_column)?;
        let right = other.column(other_column)?;

        if !left.data_type.is_comparable_with(&right.data_type) {
            return Err(Error::Schema(format!(
                "cannot join {}.{} ({}) with {}.{} ({})",
                self.name(),
                left.name,
                left.data_type,
                other.name(),
                right.name,
                right.data_type
            )));
        }
        let key_type = if left.data_type == right.data_type {
            left.data_type
        } else {
            DataType::Float
        };

        let mut columns = self.qualified_columns();
        columns.extend(other.qualified_columns());

        let rows = match kind {
            JoinKind::Inner | JoinKind::Left => hash_join(
                self.rows.values(),
                other.rows.values(),
                (left.position, right.position),
                key_type,
                kind == JoinKind::Left,
                other.schema().column_count(),
                |probe, build| probe.concat(build),
            ),
            JoinKind::Right => hash_join(
                other.rows.values(),
                self.rows.values(),
                (right.position, left.position),
                key_type,
                true,
                self.schema().column_count(),
                |probe, build| build.concat(probe),
            ),
        };

        Ok(ResultSet::new(columns, rows))
    }

    /// Describe columns, keys and indexes
    pub fn describe(&self) -> TableDescription {
        TableDescription {
            name: self.name().to_string(),
            columns: self.schema().columns().to_vec(),
            primary_key: self.schema().primary_key().map(|c| c.name.clone()),
            row_count: self.len(),
            indexed_columns: self
                .indexes
                .keys()
                .map(|&pos| self.schema().columns()[pos].name.clone())
                .collect(),
        }
    }

    // ========== Mutations ==========

    /// Append an already validated row and index it
    pub(crate) fn insert_tuple(&mut self, tuple: Tuple) -> RowId {
        let id = self.next_row_id;
        self.next_row_id += 1;
        for index in self.indexes.values_mut() {
            index.insert(&tuple.values()[index.column()], id);
        }
        self.rows.insert(id, tuple);
        id
    }

    /// Build the new contents of rows `ids` after applying `changes`
    ///
    /// Key uniqueness is checked against untouched rows and among the
    /// updated rows themselves. Nothing is modified.
    pub(crate) fn plan_update(
        &self,
        ids: &[RowId],
        changes: &[(usize, Value)],
    ) -> Result<Vec<(RowId, Tuple)>> {
        let updated: HashSet<RowId> = ids.iter().copied().collect();
        let planned: Vec<(RowId, Tuple)> = ids
            .iter()
            .filter_map(|&id| {
                let mut tuple = self.rows.get(&id)?.clone();
                for (pos, value) in changes {
                    tuple.set(*pos, value.clone());
                }
                Some((id, tuple))
            })
            .collect();

        for col in self.schema().columns().iter().filter(|c| c.is_key()) {
            if !changes.iter().any(|(pos, _)| *pos == col.position) {
                continue;
            }
            let Some(index) = self.indexes.get(&col.position) else {
                continue;
            };

            let mut seen = HashSet::new();
            for (_, tuple) in &planned {
                let key = &tuple.values()[col.position];
                if key.is_null() {
                    continue;
                }
                let held_elsewhere = index.get(key).any(|other| !updated.contains(&other));
                if held_elsewhere || !seen.insert(key.clone()) {
                    return Err(self.duplicate_key(col, key));
                }
            }
        }

        Ok(planned)
    }

    /// Replace row `id`, keeping indexes current
    pub(crate) fn replace_tuple(&mut self, id: RowId, tuple: Tuple) -> Option<Tuple> {
        let current = self.rows.get_mut(&id)?;
        for index in self.indexes.values_mut() {
            let pos = index.column();
            let (old, new) = (&current.values()[pos], &tuple.values()[pos]);
            if old != new {
                index.remove(old, id);
                index.insert(new, id);
            }
        }
        Some(std::mem::replace(current, tuple))
    }

    /// Remove row `id`, keeping indexes current
    pub(crate) fn remove_row(&mut self, id: RowId) -> Option<Tuple> {
        let tuple = self.rows.shift_remove(&id)?;
        for index in self.indexes.values_mut() {
            index.remove(&tuple.values()[index.column()], id);
        }
        Some(tuple)
    }
}

/// Coerce `raw` to the column's type and enforce nullability
fn check_value(col: &Column, raw: Value) -> Result<Value> {
    let value = raw.coerce_to(col.data_type).ok_or_else(|| Error::TypeMismatch {
        column: col.name.clone(),
        expected: col.data_type,
        found: raw.type_name().to_string(),
    })?;
    if value.is_null() && !col.nullable {
        return Err(Error::NullNotAllowed(col.name.clone()));
    }
    Ok(value)
}

/// Coerce a predicate value to the column's type
///
/// A float compared with an INTEGER column stays a float unless it is
/// integral, so `age > 2.5` works and `id = 3.0` can still use the index.
fn bind_value(col: &Column, value: &Value) -> Result<Value> {
    if let Some(v) = value.coerce_to(col.data_type) {
        return Ok(v);
    }
    match (col.data_type, value) {
        (DataType::Integer, Value::Float(f)) => {
            if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                Ok(Value::Integer(*f as i64))
            } else {
                Ok(Value::Float(*f))
            }
        }
        _ => Err(Error::TypeMismatch {
            column: col.name.clone(),
            expected: col.data_type,
            found: value.type_name().to_string(),
        }),
    }
}

fn join_key(row: &Tuple, column: usize, key_type: DataType) -> Option<Value> {
    row.get(column)
        .filter(|v| !v.is_null())
        .and_then(|v| v.coerce_to(key_type))
}

/// Build a hash table over `build`, then stream `probe` through it
///
/// With `keep_unmatched`, probe rows without a match are combined with a
/// NULL row of `build_width` columns.
fn hash_join<'a, F>(
    probe: impl Iterator<Item = &'a Tuple>,
    build: impl Iterator<Item = &'a Tuple>,
    (probe_column, build_column): (usize, usize),
    key_type: DataType,
    keep_unmatched: bool,
    build_width: usize,
    combine: F,
) -> Vec<Tuple>
where
    F: Fn(&Tuple, &Tuple) -> Tuple,
{
    let mut buckets: HashMap<Value, Vec<&Tuple>> = HashMap::new();
    for row in build {
        if let Some(key) = join_key(row, build_column, key_type) {
            buckets.entry(key).or_default().push(row);
        }
    }

    let padding = Tuple::nulls(build_width);
    let mut out = Vec::new();
    for row in probe {
        match join_key(row, probe_column, key_type).and_then(|k| buckets.get(&k)) {
            Some(matched) => out.extend(matched.iter().map(|b| combine(row, b))),
            None if keep_unmatched => out.push(combine(row, &padding)),
            None => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::OnDelete;
    use crate::storage::result::row;

    fn users() -> Table {
        Table::new(TableDef::new(
            "users",
            Schema::from_columns(vec![
                Column::new("id", DataType::Integer).primary_key(true),
                Column::new("name", DataType::Text).nullable(false),
                Column::new("email", DataType::Text).unique(true),
                Column::new("age", DataType::Integer),
            ]),
        ))
    }

    fn tasks() -> Table {
        Table::new(TableDef::new(
            "tasks",
            Schema::from_columns(vec![
                Column::new("id", DataType::Integer).primary_key(true),
                Column::new("user_id", DataType::Integer).references(
                    "users",
                    "id",
                    OnDelete::Cascade,
                ),
                Column::new("title", DataType::Text),
            ]),
        ))
    }

    fn insert(table: &mut Table, r: Row) -> Result<RowId> {
        let tuple = table.prepare_row(&r)?;
        table.check_unique(&tuple, None)?;
        Ok(table.insert_tuple(tuple))
    }

    fn user(id: i64, name: &str, email: &str, age: Option<i64>) -> Row {
        row([
            ("id", Value::from(id)),
            ("name", Value::from(name)),
            ("email", Value::from(email)),
            ("age", Value::from(age)),
        ])
    }

    fn populated_users() -> Table {
        let mut t = users();
        insert(&mut t, user(1, "John", "john@x.com", Some(30))).unwrap();
        insert(&mut t, user(2, "Jane", "jane@x.com", Some(25))).unwrap();
        insert(&mut t, user(3, "Ann", "ann@x.com", None)).unwrap();
        t
    }

    #[test]
    fn test_prepare_row_types() {
        let t = users();

        let err = t
            .prepare_row(&row([("id", Value::from("1")), ("name", Value::from("x"))]))
            .unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));

        let err = t.prepare_row(&row([("id", Value::from(1))])).unwrap_err();
        assert!(matches!(err, Error::NullNotAllowed(ref c) if c == "name"));

        let err = t
            .prepare_row(&row([("id", Value::from(1)), ("nick", Value::from("x"))]))
            .unwrap_err();
        assert!(matches!(err, Error::ColumnNotFound(_, _)));

        let tuple = t
            .prepare_row(&row([("id", Value::from(1)), ("name", Value::from("x"))]))
            .unwrap();
        assert!(tuple.values()[2].is_null());
    }

    #[test]
    fn test_unique_checks_in_declaration_order() {
        let mut t = populated_users();

        // collides on both id and email; the primary key is reported
        let err = insert(&mut t, user(1, "Dup", "jane@x.com", None)).unwrap_err();
        match err {
            Error::ConstraintViolation(msg) => assert!(msg.contains("'id'")),
            other => panic!("unexpected error: {other}"),
        }

        let err = insert(&mut t, user(9, "Dup", "jane@x.com", None)).unwrap_err();
        assert!(matches!(err, Error::ConstraintViolation(msg) if msg.contains("'email'")));
        assert_eq!(t.len(), 3);
    }

    #[test]
    fn test_unique_allows_many_nulls() {
        let mut t = users();
        insert(&mut t, row([("id", Value::from(1)), ("name", Value::from("a"))])).unwrap();
        insert(&mut t, row([("id", Value::from(2)), ("name", Value::from("b"))])).unwrap();
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn test_select_with_and_without_index() {
        let t = populated_users();

        let rs = t.select(&[Condition::eq("id", 2)]).unwrap();
        assert_eq!(rs.len(), 1);
        assert_eq!(rs.get(0, "name"), Some(&Value::from("Jane")));

        let rs = t
            .select(&[Condition::new("age", CompareOp::Gte, 25)])
            .unwrap();
        assert_eq!(rs.column_values("id").unwrap(), vec![&Value::from(1), &Value::from(2)]);

        let rs = t
            .select(&[Condition::new("age", CompareOp::Eq, Value::Null)])
            .unwrap();
        assert_eq!(rs.get(0, "name"), Some(&Value::from("Ann")));

        assert_eq!(t.count(&[]).unwrap(), 3);
    }

    #[test]
    fn test_select_index_rechecks_full_predicate() {
        let t = populated_users();
        let predicate = [
            Condition::eq("id", 1),
            Condition::new("age", CompareOp::Lt, 30),
        ];
        assert!(t.select_ids(&predicate).unwrap().is_empty());
        assert_eq!(t.select_ids(&predicate).unwrap(), t.scan_ids(&predicate).unwrap());
    }

    #[test]
    fn test_select_coerces_predicate_values() {
        let t = populated_users();

        assert_eq!(t.count(&[Condition::eq("id", 2.0)]).unwrap(), 1);
        assert_eq!(
            t.count(&[Condition::new("age", CompareOp::Gt, 26.5)]).unwrap(),
            1
        );
        assert!(matches!(
            t.select(&[Condition::eq("id", "2")]),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(matches!(
            t.select(&[Condition::eq("nickname", "x")]),
            Err(Error::ColumnNotFound(_, _))
        ));
    }

    #[test]
    fn test_plan_update_detects_collisions() {
        let t = populated_users();
        let ids = t.select_ids(&[]).unwrap();

        // every row would get the same email
        let changes = t.prepare_changes(&row([("email", Value::from("same@x.com"))])).unwrap();
        assert!(matches!(
            t.plan_update(&ids, &changes),
            Err(Error::ConstraintViolation(_))
        ));

        // moving row 1 onto row 2's key
        let one = t.select_ids(&[Condition::eq("id", 1)]).unwrap();
        let changes = t.prepare_changes(&row([("id", Value::from(2))])).unwrap();
        assert!(matches!(
            t.plan_update(&one, &changes),
            Err(Error::ConstraintViolation(_))
        ));
    }

    #[test]
    fn test_replace_and_remove_maintain_indexes() {
        let mut t = populated_users();
        let ids = t.select_ids(&[Condition::eq("id", 1)]).unwrap();
        let changes = t.prepare_changes(&row([("id", Value::from(10))])).unwrap();
        for (id, tuple) in t.plan_update(&ids, &changes).unwrap() {
            t.replace_tuple(id, tuple);
        }

        assert_eq!(t.count(&[Condition::eq("id", 1)]).unwrap(), 0);
        assert_eq!(t.count(&[Condition::eq("id", 10)]).unwrap(), 1);
        // order is preserved after an update
        assert_eq!(t.select(&[]).unwrap().get(0, "id"), Some(&Value::from(10)));

        t.remove_row(ids[0]);
        assert_eq!(t.count(&[Condition::eq("id", 10)]).unwrap(), 0);
        assert!(!t.contains_key(0, &Value::from(10)));
        insert(&mut t, user(10, "Again", "again@x.com", None)).unwrap();
    }

    #[test]
    fn test_join_kinds() {
        let u = populated_users();
        let mut t = tasks();
        for (id, uid, title) in [(1, Some(1), "a"), (2, Some(1), "b"), (3, None, "c")] {
            insert(
                &mut t,
                row([
                    ("id", Value::from(id)),
                    ("user_id", Value::from(uid)),
                    ("title", Value::from(title)),
                ]),
            )
            .unwrap();
        }

        let inner = u.join(&t, "id", "user_id", JoinKind::Inner).unwrap();
        assert_eq!(inner.columns[0], "users.id");
        assert_eq!(inner.columns[4], "tasks.id");
        assert_eq!(inner.len(), 2);

        let left = u.join(&t, "id", "user_id", JoinKind::Left).unwrap();
        assert_eq!(left.len(), 4);
        assert!(left.get(3, "tasks.id").unwrap().is_null());

        let right = u.join(&t, "id", "user_id", JoinKind::Right).unwrap();
        assert_eq!(right.len(), 3);
        assert_eq!(right.columns[0], "users.id");
        assert_eq!(right.get(2, "tasks.title"), Some(&Value::from("c")));
        assert!(right.get(2, "users.id").unwrap().is_null());
    }

    #[test]
    fn test_join_rejects_incomparable_columns() {
        let u = populated_users();
        let t = tasks();
        assert!(matches!(
            u.join(&t, "name", "user_id", JoinKind::Inner),
            Err(Error::Schema(_))
        ));
    }

    #[test]
    fn test_join_integer_with_float() {
        let u = populated_users();
        let mut scores = Table::new(TableDef::new(
            "scores",
            Schema::from_columns(vec![Column::new("user_ref", DataType::Float)]),
        ));
        insert(&mut scores, row([("user_ref", Value::from(2.0))])).unwrap();

        let rs = u.join(&scores, "id", "user_ref", JoinKind::Inner).unwrap();
        assert_eq!(rs.len(), 1);
        assert_eq!(rs.get(0, "users.name"), Some(&Value::from("Jane")));
    }

    #[test]
    fn test_describe() {
        let d = tasks().describe();
        assert_eq!(d.primary_key.as_deref(), Some("id"));
        assert_eq!(d.indexed_columns, vec!["id".to_string(), "user_id".to_string()]);
        assert_eq!(d.row_count, 0);
    }

    #[test]
    fn test_restore_rejects_duplicate_keys() {
        let def = users().definition().clone();
        let rows = vec![
            Tuple::new(vec![Value::from(1), Value::from("a"), Value::Null, Value::Null]),
            Tuple::new(vec![Value::from(1), Value::from("b"), Value::Null, Value::Null]),
        ];
        assert!(matches!(
            Table::restore(def, rows),
            Err(Error::ConstraintViolation(_))
        ));
    }
}
