//! Shared database handle
//!
//! Wraps a `Database` in a reader-writer lock. Writers hold the lock for the
//! whole change including the save, so readers only ever observe the state
//! before or after a statement.

use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::Database;
use crate::config::DatabaseConfig;
use crate::error::Result;
use crate::executor::{self, QueryResult};
use crate::sql::parse;

/// Clonable, thread-safe handle to one database
#[derive(Debug, Clone)]
pub struct SharedDatabase {
    inner: Arc<RwLock<Database>>,
}

impl SharedDatabase {
    pub fn new(db: Database) -> Self {
        Self {
            inner: Arc::new(RwLock::new(db)),
        }
    }

    /// Open the database described by `config`
    pub fn open(config: &DatabaseConfig) -> Result<Self> {
        Ok(Self::new(Database::open(config)?))
    }

    /// Take the shared lock
    pub fn read(&self) -> RwLockReadGuard<'_, Database> {
        self.inner.read()
    }

    /// Take the exclusive lock
    pub fn write(&self) -> RwLockWriteGuard<'_, Database> {
        self.inner.write()
    }

    /// Parse and run one statement
    ///
    /// The statement is parsed before any lock is taken. Reads share the
    /// lock, everything else holds it exclusively.
    pub fn execute(&self, sql: &str) -> Result<QueryResult> {
        let statement = parse(sql)?;
        if statement.is_mutation() {
            executor::execute(&mut self.inner.write(), statement)
        } else {
            executor::execute_read(&self.inner.read(), &statement)
        }
    }
}
