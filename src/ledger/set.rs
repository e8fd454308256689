//! Named ledgers of one database
//!
//! A ledger set is a directory of `<name>.jsonl` files, for example
//! `transactions` and `audit_logs`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use super::chain::{Ledger, VerificationResult};
use crate::config::{is_valid_name, ledger_file, DatabaseConfig};
use crate::error::{Error, Result};

/// A collection of named ledgers
#[derive(Debug)]
pub struct LedgerSet {
    /// None for in-memory sets
    dir: Option<PathBuf>,
    sync: bool,
    ledgers: RwLock<BTreeMap<String, Arc<Ledger>>>,
}

impl LedgerSet {
    /// Open every ledger file in `dir`; a missing directory is an empty set
    pub fn open(dir: impl Into<PathBuf>, sync: bool) -> Result<Self> {
        let dir = dir.into();
        let mut ledgers = BTreeMap::new();

        match fs::read_dir(&dir) {
            Ok(read_dir) => {
                for dir_entry in read_dir {
                    let path = dir_entry?.path();
                    let Some(name) = ledger_name(&path) else {
                        continue;
                    };
                    let ledger = Ledger::open(name.clone(), &path, sync)?;
                    ledgers.insert(name, Arc::new(ledger));
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        info!(dir = %dir.display(), ledgers = ledgers.len(), "ledgers opened");
        Ok(Self {
            dir: Some(dir),
            sync,
            ledgers: RwLock::new(ledgers),
        })
    }

    /// The ledgers of the database described by `config`
    pub fn for_database(config: &DatabaseConfig) -> Result<Self> {
        config.validate()?;
        Self::open(config.ledger_dir(), config.sync)
    }

    /// A set whose ledgers are never written to disk
    pub fn in_memory() -> Self {
        Self {
            dir: None,
            sync: false,
            ledgers: RwLock::new(BTreeMap::new()),
        }
    }

    /// Create an empty ledger
    pub fn create(&self, name: &str) -> Result<Arc<Ledger>> {
        if !is_valid_name(name) {
            return Err(Error::Schema(format!("invalid ledger name '{}'", name)));
        }

        let mut ledgers = self.ledgers.write();
        if ledgers.contains_key(name) {
            return Err(Error::TableAlreadyExists(name.to_string()));
        }

        let ledger = match &self.dir {
            Some(dir) => {
                let path = ledger_file(dir, name);
                fs::create_dir_all(dir)?;
                fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)?;
                Ledger::open(name, path, self.sync)?
            }
            None => Ledger::in_memory(name),
        };

        let ledger = Arc::new(ledger);
        ledgers.insert(name.to_string(), Arc::clone(&ledger));
        info!(ledger = name, "ledger created");
        Ok(ledger)
    }

    /// Get a ledger by name
    pub fn get(&self, name: &str) -> Option<Arc<Ledger>> {
        self.ledgers.read().get(name).cloned()
    }

    /// Get a ledger, creating it if needed
    pub fn get_or_create(&self, name: &str) -> Result<Arc<Ledger>> {
        match self.get(name) {
            Some(ledger) => Ok(ledger),
            None => self.create(name),
        }
    }

    /// Ledger names, sorted
    pub fn list(&self) -> Vec<String> {
        self.ledgers.read().keys().cloned().collect()
    }

    /// Verify every ledger
    pub fn verify_all(&self) -> BTreeMap<String, VerificationResult> {
        let ledgers: Vec<Arc<Ledger>> = self.ledgers.read().values().cloned().collect();
        ledgers
            .into_iter()
            .map(|ledger| (ledger.name().to_string(), ledger.verify_chain()))
            .collect()
    }
}

fn ledger_name(path: &Path) -> Option<String> {
    if path.extension()? != "jsonl" {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    is_valid_name(stem).then(|| stem.to_string())
}
