//! WHERE predicates
//!
//! A predicate is a conjunction of `column op value` comparisons.

use std::cmp::Ordering;
use std::fmt;

use super::value::Value;

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl CompareOp {
    /// Does `ordering` (cell compared to value) satisfy this operator?
    fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Neq => ordering != Ordering::Equal,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Lte => ordering != Ordering::Greater,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Gte => ordering != Ordering::Less,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompareOp::Eq => "=",
            CompareOp::Neq => "<>",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
        };
        write!(f, "{}", s)
    }
}

/// A single `column op value` comparison
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// Column name, optionally qualified as `table.column` for join results
    pub column: String,
    pub op: CompareOp,
    pub value: Value,
}

impl Condition {
    pub fn new(column: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    /// Shorthand for `column = value`
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, CompareOp::Eq, value)
    }
}

/// Evaluate `cell op value`
///
/// `= NULL` and `<> NULL` test for null. Any other comparison involving
/// NULL, or between types that cannot be reconciled, is false. A value of
/// another type is coerced to the cell's type when possible.
pub fn matches(cell: &Value, op: CompareOp, value: &Value) -> bool {
    match (cell.is_null(), value.is_null()) {
        (_, true) => match op {
            CompareOp::Eq => cell.is_null(),
            CompareOp::Neq => !cell.is_null(),
            _ => false,
        },
        (true, false) => false,
        (false, false) => cell
            .compare(value)
            .or_else(|| {
                // e.g. a text literal against a DATETIME cell
                let coerced = value.coerce_to(cell.data_type()?)?;
                cell.compare(&coerced)
            })
            .map(|ordering| op.accepts(ordering))
            .unwrap_or(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DataType;

    #[test]
    fn test_ordering_operators() {
        let five = Value::Integer(5);
        assert!(matches(&five, CompareOp::Eq, &Value::Integer(5)));
        assert!(matches(&five, CompareOp::Gte, &Value::Integer(5)));
        assert!(matches(&five, CompareOp::Lt, &Value::Float(5.5)));
        assert!(!matches(&five, CompareOp::Gt, &Value::Integer(5)));
        assert!(matches(&five, CompareOp::Neq, &Value::Integer(4)));
    }

    #[test]
    fn test_null_semantics() {
        assert!(matches(&Value::Null, CompareOp::Eq, &Value::Null));
        assert!(!matches(&Value::Integer(1), CompareOp::Eq, &Value::Null));
        assert!(matches(&Value::Integer(1), CompareOp::Neq, &Value::Null));
        assert!(!matches(&Value::Null, CompareOp::Lt, &Value::Integer(1)));
        assert!(!matches(&Value::Null, CompareOp::Neq, &Value::Integer(1)));
    }

    #[test]
    fn test_value_coerced_to_cell_type() {
        let cell = Value::from("2024-01-05").coerce_to(DataType::DateTime).unwrap();
        assert!(matches(&cell, CompareOp::Gt, &Value::from("2024-01-04 23:00:00")));
        assert!(!matches(&cell, CompareOp::Eq, &Value::from("not a date")));
    }

    #[test]
    fn test_incompatible_types_never_match() {
        assert!(!matches(&Value::from("1"), CompareOp::Eq, &Value::Integer(1)));
        assert!(!matches(&Value::from("1"), CompareOp::Neq, &Value::Integer(1)));
    }
}
