//! Transaction module
//!
//! This module contains the staged-operation buffer used by explicit
//! transactions.

pub mod transaction;

pub use transaction::{StagedOp, Transaction, TransactionState};
