//! Value and Tuple types for LedgerDB
//!
//! This module defines how typed column values are represented in memory,
//! compared, coerced to declared column types and written to JSON.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

use crate::catalog::DataType;

/// Canonical text form of DATETIME values in snapshots
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// A value in the database
#[derive(Debug, Clone)]
pub enum Value {
    /// NULL value
    Null,
    /// Boolean value
    Boolean(bool),
    /// Integer value (64-bit)
    Integer(i64),
    /// Float value (64-bit, always finite)
    Float(f64),
    /// Text value
    Text(String),
    /// Date and time
    DateTime(NaiveDateTime),
}

// Floats compare bitwise so that values can key hash indexes and hash joins
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Boolean(v) => v.hash(state),
            Value::Integer(v) => v.hash(state),
            Value::Float(v) => v.to_bits().hash(state),
            Value::Text(v) => v.hash(state),
            Value::DateTime(v) => v.hash(state),
        }
    }
}

impl Value {
    /// Check if this value is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Try to convert to i64
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to convert to f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Try to borrow as text
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Boolean(_) => "BOOLEAN",
            Value::Integer(_) => "INTEGER",
            Value::Float(_) => "FLOAT",
            Value::Text(_) => "TEXT",
            Value::DateTime(_) => "DATETIME",
        }
    }

    /// Column type this value belongs to; `None` for NULL
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Null => None,
            Value::Boolean(_) => Some(DataType::Boolean),
            Value::Integer(_) => Some(DataType::Integer),
            Value::Float(_) => Some(DataType::Float),
            Value::Text(_) => Some(DataType::Text),
            Value::DateTime(_) => Some(DataType::DateTime),
        }
    }

    /// Compare two non-null values
    ///
    /// Integers and floats compare numerically, text lexicographically and
    /// datetimes chronologically. Returns `None` for NULL or incompatible
    /// types.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),

            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Integer(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Integer(b)) => a.partial_cmp(&(*b as f64)),

            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),

            _ => None,
        }
    }

    /// Convert this value to the representation of `data_type`
    ///
    /// NULL passes through unchanged; nullability is the caller's concern.
    /// Returns `None` when the value cannot represent the type.
    pub fn coerce_to(&self, data_type: DataType) -> Option<Value> {
        match (self, data_type) {
            (Value::Null, _) => Some(Value::Null),

            (Value::Integer(i), DataType::Integer) => Some(Value::Integer(*i)),

            (Value::Float(f), DataType::Float) => normalize_float(*f),
            (Value::Integer(i), DataType::Float) => normalize_float(*i as f64),

            (Value::Boolean(b), DataType::Boolean) => Some(Value::Boolean(*b)),
            (Value::Integer(0), DataType::Boolean) => Some(Value::Boolean(false)),
            (Value::Integer(1), DataType::Boolean) => Some(Value::Boolean(true)),

            (Value::Text(s), DataType::Text) => Some(Value::Text(s.clone())),

            (Value::DateTime(dt), DataType::DateTime) => Some(Value::DateTime(*dt)),
            (Value::Text(s), DataType::DateTime) => parse_datetime(s).map(Value::DateTime),

            _ => None,
        }
    }

    /// Encode as a plain JSON value for snapshots
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Integer(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::DateTime(dt) => serde_json::Value::String(dt.format(DATETIME_FORMAT).to_string()),
        }
    }

    /// Decode a JSON value stored for a column of type `data_type`
    pub fn from_json(json: &serde_json::Value, data_type: DataType) -> Option<Value> {
        let raw = match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Float(n.as_f64()?),
            },
            serde_json::Value::String(s) => Value::Text(s.clone()),
            _ => return None,
        };
        raw.coerce_to(data_type)
    }
}

fn normalize_float(f: f64) -> Option<Value> {
    if !f.is_finite() {
        return None;
    }
    // -0.0 and 0.0 must hash the same
    Some(Value::Float(if f == 0.0 { 0.0 } else { f }))
}

/// Parse a DATETIME literal
///
/// Accepted forms: `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS[.f]`,
/// `YYYY-MM-DDTHH:MM:SS[.f]` and RFC 3339 (converted to UTC).
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "{}", s),
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(x) => x.into(),
            None => Value::Null,
        }
    }
}

/// A row of values aligned with a schema (or with a result's columns)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Tuple {
    values: Vec<Value>,
}

impl Tuple {
    /// Create a new tuple from values
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// A tuple of `width` NULLs
    pub fn nulls(width: usize) -> Self {
        Self {
            values: vec![Value::Null; width],
        }
    }

    /// Get a value by index
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Set a value by index
    pub fn set(&mut self, index: usize, value: Value) {
        if index < self.values.len() {
            self.values[index] = value;
        }
    }

    /// Get all values
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Get the number of values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the tuple is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Consume and get values
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Keep only the values at `indices`, in that order
    pub fn project(&self, indices: &[usize]) -> Tuple {
        let values = indices
            .iter()
            .filter_map(|&i| self.values.get(i).cloned())
            .collect();
        Tuple::new(values)
    }

    /// Concatenate with another tuple (for joins)
    pub fn concat(&self, other: &Tuple) -> Tuple {
        let mut values = self.values.clone();
        values.extend(other.values.iter().cloned());
        Tuple::new(values)
    }
}

impl FromIterator<Value> for Tuple {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Tuple::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Tuple {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_comparison() {
        assert_eq!(
            Value::Integer(1).compare(&Value::Integer(2)),
            Some(Ordering::Less)
        );
        assert_eq!(
            Value::Integer(2).compare(&Value::Float(1.5)),
            Some(Ordering::Greater)
        );
        assert_eq!(
            Value::from("apple").compare(&Value::from("banana")),
            Some(Ordering::Less)
        );
        assert_eq!(Value::Integer(1).compare(&Value::from("1")), None);
        assert_eq!(Value::Null.compare(&Value::Null), None);
    }

    #[test]
    fn test_datetime_compares_chronologically() {
        let early = Value::from("2024-01-02").coerce_to(DataType::DateTime).unwrap();
        let late = Value::from("2024-01-10 08:30:00")
            .coerce_to(DataType::DateTime)
            .unwrap();
        assert_eq!(early.compare(&late), Some(Ordering::Less));

        // lexicographic order of the raw strings would disagree here
        let a = Value::from("2024-01-02T09:00:00Z").coerce_to(DataType::DateTime).unwrap();
        let b = Value::from("2024-01-02 10:00:00").coerce_to(DataType::DateTime).unwrap();
        assert_eq!(a.compare(&b), Some(Ordering::Less));
    }

    #[test]
    fn test_coercion() {
        assert_eq!(
            Value::Integer(3).coerce_to(DataType::Float),
            Some(Value::Float(3.0))
        );
        assert_eq!(
            Value::Integer(1).coerce_to(DataType::Boolean),
            Some(Value::Boolean(true))
        );
        assert_eq!(Value::from("3").coerce_to(DataType::Integer), None);
        assert_eq!(Value::Float(1.5).coerce_to(DataType::Integer), None);
        assert_eq!(Value::from("not a date").coerce_to(DataType::DateTime), None);
        assert_eq!(Value::Float(f64::NAN).coerce_to(DataType::Float), None);
        assert_eq!(Value::Null.coerce_to(DataType::Text), Some(Value::Null));
        assert_eq!(
            Value::Float(-0.0).coerce_to(DataType::Float),
            Value::Float(0.0).coerce_to(DataType::Float)
        );
    }

    #[test]
    fn test_json_encoding() {
        let dt = parse_datetime("2024-03-01 12:00:00").unwrap();
        let json = Value::DateTime(dt).to_json();
        assert_eq!(json, serde_json::json!("2024-03-01T12:00:00"));
        assert_eq!(
            Value::from_json(&json, DataType::DateTime),
            Some(Value::DateTime(dt))
        );

        assert_eq!(
            Value::from_json(&serde_json::json!(7), DataType::Float),
            Some(Value::Float(7.0))
        );
        assert_eq!(Value::from_json(&serde_json::json!("x"), DataType::Integer), None);
        assert_eq!(Value::from_json(&serde_json::json!([1]), DataType::Text), None);
    }

    #[test]
    fn test_tuple_operations() {
        let t1 = Tuple::new(vec![Value::Integer(1), Value::from("a")]);
        let t2 = Tuple::nulls(2);
        let joined = t1.concat(&t2);

        assert_eq!(joined.len(), 4);
        assert!(joined.get(3).unwrap().is_null());
        assert_eq!(joined.project(&[1, 0]).values()[0], Value::from("a"));
    }
}
