//! Data types for LedgerDB
//!
//! This module defines the column types supported by the engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Column data types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataType {
    /// 64-bit signed integer
    Integer,
    /// Unlimited text
    Text,
    /// Double-precision floating point
    Float,
    /// Boolean
    Boolean,
    /// Date and time without zone, compared chronologically
    DateTime,
}

impl DataType {
    /// Resolve a type name as written in a schema or snapshot
    ///
    /// Accepts the canonical names and the common SQL spellings
    /// (`INT`, `VARCHAR`, `REAL`, `DOUBLE`, `BOOL`, `TIMESTAMP`, `DATE`).
    pub fn from_name(name: &str) -> Option<DataType> {
        match name.to_uppercase().as_str() {
            "INTEGER" | "INT" | "BIGINT" => Some(DataType::Integer),
            "TEXT" | "VARCHAR" | "STRING" => Some(DataType::Text),
            "FLOAT" | "REAL" | "DOUBLE" => Some(DataType::Float),
            "BOOLEAN" | "BOOL" => Some(DataType::Boolean),
            "DATETIME" | "TIMESTAMP" | "DATE" => Some(DataType::DateTime),
            _ => None,
        }
    }

    /// Check if this type is numeric
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Integer | DataType::Float)
    }

    /// Check if values of this type can be compared with values of `other`
    pub fn is_comparable_with(&self, other: &DataType) -> bool {
        self == other || (self.is_numeric() && other.is_numeric())
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Integer => write!(f, "INTEGER"),
            DataType::Text => write!(f, "TEXT"),
            DataType::Float => write!(f, "FLOAT"),
            DataType::Boolean => write!(f, "BOOLEAN"),
            DataType::DateTime => write!(f, "DATETIME"),
        }
    }
}
