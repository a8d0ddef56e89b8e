use std::fmt;

use super::schema::ColumnType;

/// A positional argument bound to a `$n` placeholder, or a decoded column
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Text(String),
    Json(serde_json::Value),
    Bool(bool),
    Float(f64),
}

impl Value {
    pub fn column_type(&self) -> ColumnType {
        match self {
            Value::Int(_) => ColumnType::BigInt,
            Value::Text(_) => ColumnType::Text,
            Value::Json(_) => ColumnType::Json,
            Value::Bool(_) => ColumnType::Boolean,
            Value::Float(_) => ColumnType::Double,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Text(v) => write!(f, "{:?}", v),
            Value::Json(v) => write!(f, "{}", v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

/// One row, columns in table order
pub type Row = Vec<Value>;

/// Scans a row into a typed destination.
///
/// Implementations should fail (rather than default) when the row has the
/// wrong number of columns or a column of the wrong type.
pub trait FromRow: Sized {
    fn from_row(row: Row) -> Result<Self, String>;
}

impl FromRow for Row {
    fn from_row(row: Row) -> Result<Self, String> {
        Ok(row)
    }
}

/// Checks the row width before destructuring
pub fn expect_row_width(row: &Row, expected: usize) -> Result<(), String> {
    if row.len() != expected {
        return Err(format!("expected {} columns, row has {}", expected, row.len()));
    }
    Ok(())
}
