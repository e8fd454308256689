//! In-memory hash indexes
//!
//! An index maps a column value to the identities of the rows holding it.
//! Unique indexes (primary key and UNIQUE columns) hold at most one row per
//! key; foreign-key indexes are reverse lookups and may hold many. NULL keys
//! are never indexed.

use std::collections::{BTreeSet, HashMap};

use super::value::Value;

/// Stable identity of a row within its table
pub type RowId = u64;

/// Hash index over one column
#[derive(Debug, Clone)]
pub struct Index {
    /// Indexed column position in the schema
    column: usize,
    /// At most one row per key?
    unique: bool,
    /// Key -> row ids in ascending (insertion) order
    entries: HashMap<Value, BTreeSet<RowId>>,
}

impl Index {
    /// Create an empty index over `column`
    pub fn new(column: usize, unique: bool) -> Self {
        Self {
            column,
            unique,
            entries: HashMap::new(),
        }
    }

    /// Position of the indexed column
    pub fn column(&self) -> usize {
        self.column
    }

    /// Is this a unique index?
    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// Record `row_id` under `key`
    pub fn insert(&mut self, key: &Value, row_id: RowId) {
        if key.is_null() {
            return;
        }
        self.entries.entry(key.clone()).or_default().insert(row_id);
    }

    /// Forget `row_id` under `key`
    pub fn remove(&mut self, key: &Value, row_id: RowId) {
        if let Some(ids) = self.entries.get_mut(key) {
            ids.remove(&row_id);
            if ids.is_empty() {
                self.entries.remove(key);
            }
        }
    }

    /// Rows holding `key`, in insertion order
    pub fn get(&self, key: &Value) -> impl Iterator<Item = RowId> + '_ {
        self.entries
            .get(key)
            .into_iter()
            .flat_map(|ids| ids.iter().copied())
    }

    /// Does any row hold `key`?
    pub fn contains(&self, key: &Value) -> bool {
        self.entries.contains_key(key)
    }

    /// Does a row other than `except` hold `key`?
    pub fn conflicts(&self, key: &Value, except: Option<RowId>) -> bool {
        self.get(key).any(|id| Some(id) != except)
    }

    /// Number of distinct keys
    pub fn key_count(&self) -> usize {
        self.entries.len()
    }
}
