//! SQL statement and result row models.
//!
//! Backend-neutral representation of what goes to and comes back from the
//! query executor.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::errors::{AppError, AppResult};

/// A single SQL value, used both for bound parameters and for result cells.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    /// SQL NULL.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// Text value.
    Text(String),
    /// Timestamp, normalized to UTC.
    Timestamp(DateTime<Utc>),
}

impl SqlValue {
    /// Reads the value as an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Int(v) => Some(*v),
            SqlValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Reads the value as text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Reads the value as a UTC timestamp.
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            SqlValue::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        SqlValue::Text(s.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        SqlValue::Text(s)
    }
}

impl From<bool> for SqlValue {
    fn from(b: bool) -> Self {
        SqlValue::Bool(b)
    }
}

/// One result row, indexable by column position.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct QueryRow(pub Vec<SqlValue>);

impl QueryRow {
    /// Creates a row from its cells.
    pub fn new(values: Vec<SqlValue>) -> Self {
        Self(values)
    }

    /// Returns the cell at `index`, or an error if the row is too short.
    pub fn get(&self, index: usize) -> AppResult<&SqlValue> {
        self.0.get(index).ok_or_else(|| {
            AppError::UnexpectedRow(format!(
                "column {} requested from a row with {} columns",
                index,
                self.0.len()
            ))
        })
    }

    /// Reads a non-null text cell.
    pub fn get_str(&self, index: usize) -> AppResult<&str> {
        let value = self.get(index)?;
        value.as_str().ok_or_else(|| {
            AppError::UnexpectedRow(format!("column {} is not text: {:?}", index, value))
        })
    }
}

/// A parameterized SQL statement. Parameters use `$n` placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// Statement text.
    pub sql: String,
    /// Bound parameters, in placeholder order.
    pub params: Vec<SqlValue>,
}

impl Statement {
    /// Creates a statement without parameters.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Appends a bound parameter.
    pub fn bind(mut self, value: impl Into<SqlValue>) -> Self {
        self.params.push(value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_get_out_of_range() {
        let row = QueryRow::new(vec![SqlValue::Int(1)]);
        assert!(row.get(0).is_ok());
        assert!(matches!(row.get(1), Err(AppError::UnexpectedRow(_))));
    }

    #[test]
    fn test_count_as_text_is_parsed() {
        assert_eq!(SqlValue::Text(" 3 ".into()).as_i64(), Some(3));
        assert_eq!(SqlValue::Null.as_i64(), None);
    }

    #[test]
    fn test_statement_bind_order() {
        let stmt = Statement::new("SELECT $1, $2").bind("a").bind(true);
        assert_eq!(
            stmt.params,
            vec![SqlValue::Text("a".into()), SqlValue::Bool(true)]
        );
    }
}
