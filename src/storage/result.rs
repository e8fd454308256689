//! Query result sets

use indexmap::IndexMap;
use serde::Serialize;

use super::predicate::{self, Condition};
use super::value::{Tuple, Value};
use crate::error::{Error, Result};

/// An ordered mapping from column name to value
pub type Row = IndexMap<String, Value>;

/// Build a [`Row`] from `(column, value)` pairs
pub fn row<K, I>(pairs: I) -> Row
where
    K: Into<String>,
    I: IntoIterator<Item = (K, Value)>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

/// Rows returned by a select or join, with their column names
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultSet {
    /// Column names
    pub columns: Vec<String>,
    /// Result rows, aligned with `columns`
    pub rows: Vec<Tuple>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Tuple>) -> Self {
        Self { columns, rows }
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if there are no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Resolve a column name
    ///
    /// An exact match wins. Otherwise an unqualified name matches a single
    /// `table.name` column; ambiguous or unknown names are errors.
    pub fn column_index(&self, name: &str) -> Result<usize> {
        if let Some(pos) = self.columns.iter().position(|c| c == name) {
            return Ok(pos);
        }

        let suffix = format!(".{}", name);
        let mut candidates = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| !name.contains('.') && c.ends_with(&suffix));

        match (candidates.next(), candidates.next()) {
            (Some((pos, _)), None) => Ok(pos),
            (Some(_), Some(_)) => Err(Error::Schema(format!(
                "column reference '{}' is ambiguous",
                name
            ))),
            (None, _) => Err(Error::ColumnNotFound(name.to_string(), "result".to_string())),
        }
    }

    /// Value of `column` in row `row`
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let pos = self.column_index(column).ok()?;
        self.rows.get(row).and_then(|t| t.get(pos))
    }

    /// All values of one column, in row order
    pub fn column_values(&self, column: &str) -> Result<Vec<&Value>> {
        let pos = self.column_index(column)?;
        Ok(self.rows.iter().filter_map(|t| t.get(pos)).collect())
    }

    /// Keep only rows matching every condition
    pub fn filter(self, predicate: &[Condition]) -> Result<ResultSet> {
        let bound = predicate
            .iter()
            .map(|c| Ok((self.column_index(&c.column)?, c)))
            .collect::<Result<Vec<_>>>()?;

        let rows = self
            .rows
            .iter()
            .filter(|t| {
                bound.iter().all(|(pos, c)| {
                    t.get(*pos)
                        .map(|cell| predicate::matches(cell, c.op, &c.value))
                        .unwrap_or(false)
                })
            })
            .cloned()
            .collect();

        Ok(ResultSet::new(self.columns, rows))
    }

    /// Keep only the named columns, in the given order
    pub fn project(self, columns: &[String]) -> Result<ResultSet> {
        let positions = columns
            .iter()
            .map(|c| self.column_index(c))
            .collect::<Result<Vec<_>>>()?;
        let names = positions.iter().map(|&p| self.columns[p].clone()).collect();
        let rows = self.rows.iter().map(|t| t.project(&positions)).collect();
        Ok(ResultSet::new(names, rows))
    }

    /// Materialize rows as column-name maps
    pub fn to_rows(&self) -> Vec<Row> {
        self.rows
            .iter()
            .map(|t| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(t.values().iter().cloned())
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::predicate::CompareOp;

    fn joined() -> ResultSet {
        ResultSet::new(
            vec![
                "users.id".to_string(),
                "users.name".to_string(),
                "tasks.id".to_string(),
            ],
            vec![
                Tuple::new(vec![Value::Integer(1), Value::from("John"), Value::Integer(10)]),
                Tuple::new(vec![Value::Integer(2), Value::from("Jane"), Value::Null]),
            ],
        )
    }

    #[test]
    fn test_column_resolution() {
        let rs = joined();
        assert_eq!(rs.column_index("users.id").unwrap(), 0);
        assert_eq!(rs.column_index("name").unwrap(), 1);
        assert!(matches!(rs.column_index("id"), Err(Error::Schema(_))));
        assert!(matches!(
            rs.column_index("email"),
            Err(Error::ColumnNotFound(_, _))
        ));
    }

    #[test]
    fn test_filter_and_project() {
        let rs = joined()
            .filter(&[Condition::new("tasks.id", CompareOp::Eq, Value::Null)])
            .unwrap()
            .project(&["name".to_string()])
            .unwrap();

        assert_eq!(rs.columns, vec!["users.name".to_string()]);
        assert_eq!(rs.len(), 1);
        assert_eq!(rs.get(0, "name"), Some(&Value::from("Jane")));
    }

    #[test]
    fn test_to_rows() {
        let rows = joined().to_rows();
        assert_eq!(rows[0]["users.name"], Value::from("John"));
        assert_eq!(rows[1].len(), 3);
    }
}
