//! Ledger module
//!
//! This module contains the financial event types, the hash-chained ledger
//! and the set of named ledgers of a database.

pub mod chain;
pub mod event;
pub mod set;

pub use chain::{verify_entries, Ledger, VerificationResult};
pub use event::{compute_hash, EventStatus, EventType, FinancialEvent, LedgerEntry, GENESIS_HASH};
pub use set::LedgerSet;
