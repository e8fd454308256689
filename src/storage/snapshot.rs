//! Durable JSON snapshots
//!
//! The whole database is written as one pretty-printed JSON document. A save
//! writes a temp file next to the snapshot, syncs it and renames it over the
//! previous snapshot, so a crash leaves either the old or the new state.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::table::Table;
use super::value::{Tuple, Value};
use crate::catalog::{Column, Schema, TableDef};
use crate::error::{Error, Result};

/// On-disk form of one table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub name: String,
    pub columns: Vec<Column>,
    pub rows: Vec<serde_json::Map<String, serde_json::Value>>,
}

/// On-disk form of a whole database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub name: String,
    pub schema_version: u64,
    pub tables: Vec<TableSnapshot>,
}

impl Snapshot {
    /// Capture the given tables, in order
    pub fn capture<'a>(
        name: impl Into<String>,
        schema_version: u64,
        tables: impl IntoIterator<Item = &'a Table>,
    ) -> Self {
        let tables = tables
            .into_iter()
            .map(|table| {
                let columns = table.schema().columns().to_vec();
                let rows = table
                    .rows()
                    .map(|(_, tuple)| {
                        columns
                            .iter()
                            .zip(tuple.values())
                            .map(|(col, value)| (col.name.clone(), value.to_json()))
                            .collect()
                    })
                    .collect();
                TableSnapshot {
                    name: table.name().to_string(),
                    columns,
                    rows,
                }
            })
            .collect();

        Self {
            name: name.into(),
            schema_version,
            tables,
        }
    }

    /// Rebuild tables, validating the stored definitions and rows
    ///
    /// Any inconsistency (bad definition, dangling foreign key target,
    /// mistyped value, duplicate key, unresolved reference) is reported as
    /// `CorruptData`.
    pub fn restore(self) -> Result<IndexMap<String, Table>> {
        let mut tables = IndexMap::new();
        for ts in self.tables {
            let def = TableDef::new(ts.name.clone(), Schema::from_columns(ts.columns));
            def.validate().map_err(|e| corrupt(&ts.name, e))?;

            let rows = ts
                .rows
                .iter()
                .map(|r| decode_row(&def, r))
                .collect::<Result<Vec<_>>>()?;
            let table = Table::restore(def, rows).map_err(|e| corrupt(&ts.name, e))?;

            if tables.insert(ts.name.clone(), table).is_some() {
                return Err(Error::CorruptData(format!(
                    "table '{}' stored more than once",
                    ts.name
                )));
            }
        }

        check_references(&tables)?;
        Ok(tables)
    }
}

fn corrupt(table: &str, err: Error) -> Error {
    Error::CorruptData(format!("table '{}': {}", table, err))
}

fn decode_row(def: &TableDef, row: &serde_json::Map<String, serde_json::Value>) -> Result<Tuple> {
    if let Some(unknown) = row.keys().find(|k| !def.schema.has_column(k)) {
        return Err(Error::CorruptData(format!(
            "table '{}': row has unknown column '{}'",
            def.name, unknown
        )));
    }

    def.schema
        .columns()
        .iter()
        .map(|col| {
            let json = row.get(&col.name).unwrap_or(&serde_json::Value::Null);
            let value = Value::from_json(json, col.data_type).ok_or_else(|| {
                Error::CorruptData(format!(
                    "table '{}': value {} does not fit column '{}' ({})",
                    def.name, json, col.name, col.data_type
                ))
            })?;
            if value.is_null() && !col.nullable {
                return Err(Error::CorruptData(format!(
                    "table '{}': NULL stored in non-nullable column '{}'",
                    def.name, col.name
                )));
            }
            Ok(value)
        })
        .collect()
}

fn check_references(tables: &IndexMap<String, Table>) -> Result<()> {
    for table in tables.values() {
        for (col, fk) in table.schema().foreign_key_columns() {
            let target = tables.get(&fk.table).ok_or_else(|| {
                Error::CorruptData(format!(
                    "table '{}': foreign key '{}' references missing table '{}'",
                    table.name(),
                    col.name,
                    fk.table
                ))
            })?;
            let target_col = target.column(&fk.column).map_err(|e| corrupt(table.name(), e))?;

            let mut checked = HashSet::new();
            for (_, tuple) in table.rows() {
                let key = &tuple.values()[col.position];
                if key.is_null() || !checked.insert(key.clone()) {
                    continue;
                }
                if !target.contains_key(target_col.position, key) {
                    return Err(Error::CorruptData(format!(
                        "table '{}': value {} of '{}' has no match in {}.{}",
                        table.name(),
                        key,
                        col.name,
                        fk.table,
                        fk.column
                    )));
                }
            }
        }
    }
    Ok(())
}

/// Reads and atomically replaces the snapshot file
#[derive(Debug, Clone)]
pub struct Storage {
    path: PathBuf,
    sync: bool,
}

impl Storage {
    /// Storage for the snapshot at `path`; `sync` controls fsync on save
    pub fn new(path: impl Into<PathBuf>, sync: bool) -> Self {
        Self {
            path: path.into(),
            sync,
        }
    }

    /// Snapshot file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if a snapshot has been written
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Scratch file written before the rename
    pub fn temp_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// Write `snapshot` and atomically replace the previous one
    pub fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let data = serde_json::to_vec_pretty(snapshot)
            .map_err(|e| Error::Internal(format!("failed to encode snapshot: {}", e)))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = self.temp_path();
        if let Err(e) = self.write_replace(&temp_path, &data) {
            warn!(path = %self.path.display(), error = %e, "snapshot save failed");
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }

        debug!(
            path = %self.path.display(),
            bytes = data.len(),
            tables = snapshot.tables.len(),
            "snapshot saved"
        );
        Ok(())
    }

    fn write_replace(&self, temp_path: &Path, data: &[u8]) -> std::io::Result<()> {
        let mut file = File::create(temp_path)?;
        file.write_all(data)?;
        if self.sync {
            file.sync_all()?;
        }
        drop(file);

        fs::rename(temp_path, &self.path)?;

        if self.sync {
            // Persist the rename itself; not every platform can open a directory
            if let Some(dir) = self.path.parent().and_then(|p| File::open(p).ok()) {
                let _ = dir.sync_all();
            }
        }
        Ok(())
    }

    /// Read the snapshot
    pub fn load(&self) -> Result<Snapshot> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::SnapshotNotFound(self.path.clone()))
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&data).map_err(|e| {
            Error::CorruptData(format!(
                "cannot parse snapshot '{}': {}",
                self.path.display(),
                e
            ))
        })
    }
}
