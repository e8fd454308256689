//! LedgerDB - An embedded relational engine with a hash-chained ledger
//!
//! This library provides the core components of the storage engine:
//! - SQL parsing (lexer, parser, AST)
//! - Storage (values, indexes, tables, JSON snapshots)
//! - System catalog with foreign keys and cascades
//! - Database with explicit transactions and a shared handle
//! - Append-only, verifiable financial ledgers

pub mod audit;
pub mod catalog;
pub mod config;
pub mod database;
pub mod error;
pub mod executor;
pub mod ledger;
pub mod sql;
pub mod storage;
pub mod transaction;

pub use catalog::{Catalog, Column, DataType, OnDelete, TableBuilder, TableDef};
pub use config::DatabaseConfig;
pub use database::{Database, SharedDatabase, WriteOutcome};
pub use error::{Error, Result};
pub use executor::QueryResult;
pub use ledger::{
    EventStatus, EventType, FinancialEvent, Ledger, LedgerEntry, LedgerSet, VerificationResult,
};
pub use storage::{row, CompareOp, Condition, JoinKind, ResultSet, Row, Value};
