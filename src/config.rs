//! Database configuration
//!
//! Where a database keeps its files and how hard it tries to make them
//! durable.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default data directory
pub const DEFAULT_DATA_DIR: &str = "./data";

/// Default database name
pub const DEFAULT_NAME: &str = "default";

/// Snapshot file name inside a database directory
pub const SNAPSHOT_FILE: &str = "snapshot.json";

/// Ledger directory name inside a database directory
pub const LEDGER_DIR: &str = "ledgers";

/// Database configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Root directory holding one subdirectory per database
    pub data_dir: PathBuf,
    /// Database name
    pub name: String,
    /// fsync snapshot and ledger writes
    pub sync: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            name: DEFAULT_NAME.to_string(),
            sync: true,
        }
    }
}

impl DatabaseConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `LEDGERDB_DATA_DIR`, `LEDGERDB_NAME` and
    /// `LEDGERDB_SYNC`
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(dir) = std::env::var("LEDGERDB_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(name) = std::env::var("LEDGERDB_NAME") {
            config.name = name;
        }
        if let Ok(sync) = std::env::var("LEDGERDB_SYNC") {
            config.sync = parse_bool(&sync).ok_or_else(|| {
                Error::Config(format!("LEDGERDB_SYNC must be true or false, got '{}'", sync))
            })?;
        }
        Ok(config)
    }

    /// Set the data directory
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Set the database name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Enable or disable fsync
    pub fn sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }

    /// Directory of this database
    pub fn database_dir(&self) -> PathBuf {
        self.data_dir.join(&self.name)
    }

    /// Snapshot file of this database
    pub fn snapshot_path(&self) -> PathBuf {
        self.database_dir().join(SNAPSHOT_FILE)
    }

    /// Directory of this database's ledgers
    pub fn ledger_dir(&self) -> PathBuf {
        self.database_dir().join(LEDGER_DIR)
    }

    /// File of the named ledger
    pub fn ledger_path(&self, ledger: &str) -> PathBuf {
        ledger_file(&self.ledger_dir(), ledger)
    }

    /// Check the name can be used as a directory
    pub fn validate(&self) -> Result<()> {
        if !is_valid_name(&self.name) {
            return Err(Error::Config(format!(
                "invalid database name '{}'",
                self.name
            )));
        }
        Ok(())
    }
}

/// Names of databases and ledgers become file names
pub(crate) fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

pub(crate) fn ledger_file(dir: &Path, ledger: &str) -> PathBuf {
    dir.join(format!("{}.jsonl", ledger))
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
