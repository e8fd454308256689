//! Transaction buffer
//!
//! Handles the explicit transaction lifecycle (Begin, Commit, Rollback).
//! While a transaction is open, row operations are staged here in issue
//! order; commit replays them against a copy of the live tables.

use chrono::{DateTime, Utc};

use crate::storage::{Condition, Row};

/// Transaction State
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Active,
    Committed,
    Aborted,
}

/// A row operation waiting for commit
#[derive(Debug, Clone, PartialEq)]
pub enum StagedOp {
    Insert {
        table: String,
        row: Row,
    },
    Update {
        table: String,
        changes: Row,
        predicate: Vec<Condition>,
    },
    Delete {
        table: String,
        predicate: Vec<Condition>,
    },
}

impl StagedOp {
    /// Target table
    pub fn table(&self) -> &str {
        match self {
            StagedOp::Insert { table, .. }
            | StagedOp::Update { table, .. }
            | StagedOp::Delete { table, .. } => table,
        }
    }

    /// Operation name for messages and logs
    pub fn kind(&self) -> &'static str {
        match self {
            StagedOp::Insert { .. } => "INSERT",
            StagedOp::Update { .. } => "UPDATE",
            StagedOp::Delete { .. } => "DELETE",
        }
    }
}

/// Transaction Context
#[derive(Debug, Clone)]
pub struct Transaction {
    id: u64,
    state: TransactionState,
    started_at: DateTime<Utc>,
    ops: Vec<StagedOp>,
}

impl Transaction {
    /// Begin a new transaction
    pub fn new(id: u64) -> Self {
        Self {
            id,
            state: TransactionState::Active,
            started_at: Utc::now(),
            ops: Vec::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Check if transaction is active
    pub fn is_active(&self) -> bool {
        self.state == TransactionState::Active
    }

    /// Append an operation to the buffer
    pub fn stage(&mut self, op: StagedOp) {
        self.ops.push(op);
    }

    /// Staged operations, in issue order
    pub fn ops(&self) -> &[StagedOp] {
        &self.ops
    }

    /// Number of staged operations
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Check if nothing has been staged
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Mark the end of the transaction, handing back the buffer
    pub fn finish(&mut self, state: TransactionState) -> Vec<StagedOp> {
        self.state = state;
        std::mem::take(&mut self.ops)
    }
}
