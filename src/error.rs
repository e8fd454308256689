//! Error types for LedgerDB
//!
//! This module defines all error types used throughout the storage engine
//! and the ledger.

use std::path::PathBuf;

use thiserror::Error;

use crate::catalog::DataType;

/// The main error type for LedgerDB
#[derive(Error, Debug)]
pub enum Error {
    // ========== Parser Errors ==========
    #[error("Parse error: {message}{}", position_suffix(.position))]
    Parse {
        message: String,
        input: String,
        position: Option<usize>,
    },

    // ========== Schema Errors ==========
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Schema error: table '{0}' already exists")]
    TableAlreadyExists(String),

    // ========== Lookup Errors ==========
    #[error("Not found: table '{0}'")]
    TableNotFound(String),

    #[error("Not found: column '{0}' in table '{1}'")]
    ColumnNotFound(String, String),

    #[error("Not found: no snapshot at '{}'", .0.display())]
    SnapshotNotFound(PathBuf),

    // ========== Type Errors ==========
    #[error("Type mismatch: column '{column}' expects {expected}, got {found}")]
    TypeMismatch {
        column: String,
        expected: DataType,
        found: String,
    },

    #[error("Type mismatch: null value not allowed for column '{0}'")]
    NullNotAllowed(String),

    // ========== Constraint Errors ==========
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Referential integrity violation: {0}")]
    ReferentialIntegrity(String),

    // ========== Transaction Errors ==========
    #[error("Transaction error: {0}")]
    Transaction(String),

    // ========== Persistence Errors ==========
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt data: {0}")]
    CorruptData(String),

    // ========== Ledger Errors ==========
    #[error("Ledger integrity error: entry {index} is invalid ({reason})")]
    LedgerIntegrity { index: u64, reason: String },

    #[error("Reconciliation error: table change for '{transaction_id}' committed but ledger append failed: {source}")]
    Reconciliation {
        transaction_id: String,
        #[source]
        source: Box<Error>,
    },

    // ========== Configuration Errors ==========
    #[error("Configuration error: {0}")]
    Config(String),

    // ========== Internal Errors ==========
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build a parse error for `input`, pointing at `position` when known
    pub fn parse(message: impl Into<String>, input: &str, position: Option<usize>) -> Self {
        Error::Parse {
            message: message.into(),
            input: input.to_string(),
            position,
        }
    }

    /// Is this one of the validation errors raised before any mutation?
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::Schema(_)
                | Error::TableAlreadyExists(_)
                | Error::TypeMismatch { .. }
                | Error::NullNotAllowed(_)
                | Error::ConstraintViolation(_)
                | Error::ReferentialIntegrity(_)
        )
    }
}

fn position_suffix(position: &Option<usize>) -> String {
    match position {
        Some(p) => format!(" at position {}", p),
        None => String::new(),
    }
}

/// Result type alias for LedgerDB operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::TableNotFound("users".to_string());
        assert_eq!(err.to_string(), "Not found: table 'users'");

        let err = Error::parse("unexpected token 'FROM'", "SELECT FROM", Some(7));
        assert_eq!(
            err.to_string(),
            "Parse error: unexpected token 'FROM' at position 7"
        );

        let err = Error::TypeMismatch {
            column: "id".to_string(),
            expected: DataType::Integer,
            found: "TEXT".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Type mismatch: column 'id' expects INTEGER, got TEXT"
        );
    }

    #[test]
    fn test_validation_classification() {
        assert!(Error::ConstraintViolation("dup".into()).is_validation());
        assert!(!Error::Internal("boom".into()).is_validation());
    }
}
