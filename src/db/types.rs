//! Query result types for Flight Explorer.
//!
//! Defines the tabular structure every execution path produces: ordered
//! column metadata plus rows of values aligned with those columns.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// PostgreSQL type names (as reported by sqlx) that hold numbers.
const NUMERIC_TYPE_NAMES: &[&str] = &[
    "INT2",
    "INT4",
    "INT8",
    "SMALLINT",
    "INT",
    "INTEGER",
    "BIGINT",
    "FLOAT4",
    "FLOAT8",
    "REAL",
    "DOUBLE PRECISION",
    "NUMERIC",
    "DECIMAL",
];

/// Represents the result of executing a SQL statement.
///
/// A read with zero rows and a successful write both produce a result with
/// an empty `rows` vector; neither is a failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QueryResult {
    /// Column metadata for the result set, in projection order.
    pub columns: Vec<ColumnInfo>,

    /// Rows of data, each aligned with `columns`.
    pub rows: Vec<Row>,

    /// Time taken to execute the statement.
    #[serde(with = "duration_serde")]
    pub execution_time: Duration,

    /// Number of rows in the result.
    pub row_count: usize,

    /// Rows affected by a write statement. `None` for reads.
    #[serde(default)]
    pub rows_affected: Option<u64>,
}

impl QueryResult {
    /// Creates a new empty query result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query result with the given columns and rows.
    pub fn with_data(columns: Vec<ColumnInfo>, rows: Vec<Row>) -> Self {
        let row_count = rows.len();
        Self {
            columns,
            rows,
            execution_time: Duration::ZERO,
            row_count,
            rows_affected: None,
        }
    }

    /// Creates the empty result returned by a committed write statement.
    pub fn from_write(rows_affected: u64) -> Self {
        Self {
            rows_affected: Some(rows_affected),
            ..Self::default()
        }
    }

    /// Sets the execution time.
    pub fn with_execution_time(mut self, duration: Duration) -> Self {
        self.execution_time = duration;
        self
    }

    /// Returns true if the result set is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns true if this result came from a write statement.
    pub fn is_write(&self) -> bool {
        self.rows_affected.is_some()
    }

    /// Returns the column names in order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Returns the position of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Returns the names of columns that hold numbers.
    ///
    /// A column is numeric when every non-null value is an `Int` or `Float`
    /// and at least one value is non-null. With no rows to inspect, the
    /// declared column type decides.
    pub fn numeric_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(i, col)| {
                let mut seen_number = false;
                for row in &self.rows {
                    match row.get(*i) {
                        Some(Value::Int(_)) | Some(Value::Float(_)) => seen_number = true,
                        Some(Value::Null) | None => {}
                        Some(_) => return false,
                    }
                }
                if self.rows.is_empty() {
                    col.is_numeric_type()
                } else {
                    seen_number
                }
            })
            .map(|(_, col)| col.name.as_str())
            .collect()
    }

    /// Returns a copy containing only the rows where any cell contains
    /// `term`, case-insensitively.
    pub fn filter_rows(&self, term: &str) -> QueryResult {
        let needle = term.to_lowercase();
        let rows: Vec<Row> = self
            .rows
            .iter()
            .filter(|row| {
                row.iter()
                    .any(|v| !v.is_null() && v.to_display_string().to_lowercase().contains(&needle))
            })
            .cloned()
            .collect();
        QueryResult::with_data(self.columns.clone(), rows)
            .with_execution_time(self.execution_time)
    }

    /// Returns a one-line summary such as "3 rows in 12ms".
    pub fn summary(&self) -> String {
        let millis = self.execution_time.as_millis();
        match self.rows_affected {
            Some(affected) => format!("{affected} row(s) affected in {millis}ms"),
            None => format!("{} row(s) in {millis}ms", self.row_count),
        }
    }
}

/// Metadata about a column in a result set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnInfo {
    /// Column name.
    pub name: String,

    /// Column data type. Empty when the source did not report one.
    pub data_type: String,
}

impl ColumnInfo {
    /// Creates a new column info with the given name and type.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }

    /// Returns true if the declared type is a numeric PostgreSQL type.
    pub fn is_numeric_type(&self) -> bool {
        let upper = self.data_type.to_uppercase();
        NUMERIC_TYPE_NAMES.contains(&upper.as_str())
    }
}

/// A row of data from a query result.
pub type Row = Vec<Value>;

/// Represents a single value from a database query.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub enum Value {
    /// NULL value.
    #[default]
    Null,

    /// Boolean value.
    Bool(bool),

    /// Signed integer (up to i64).
    Int(i64),

    /// Floating point number.
    Float(f64),

    /// Text/string value.
    String(String),

    /// Binary data.
    Bytes(Vec<u8>),
}

impl Value {
    /// Returns true if this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the value as a float if it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Attempts to convert the value to a string representation.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::String(s) => s.clone(),
            Value::Bytes(b) => format!("<{} bytes>", b.len()),
        }
    }

    /// Converts the value to its CSV cell text. NULL becomes an empty cell.
    pub fn to_csv_field(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bytes(b) => b.iter().map(|byte| format!("{byte:02x}")).collect(),
            other => other.to_display_string(),
        }
    }

    /// Converts the value to JSON for the HTTP wire format.
    ///
    /// Non-finite floats have no JSON number form and become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Bytes(b) => serde_json::Value::Array(
                b.iter().map(|byte| serde_json::Value::from(*byte)).collect(),
            ),
        }
    }

    /// Converts a JSON value received over the wire back into a `Value`.
    ///
    /// Nested arrays and objects are kept as their JSON text.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
            },
            serde_json::Value::String(s) => Value::String(s.clone()),
            other => Value::String(other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

// Conversion implementations for common types
impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

/// Serde support for Duration (not natively supported by serde).
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_nanos().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let nanos = u128::deserialize(deserializer)?;
        Ok(Duration::from_nanos(nanos as u64))
    }
}
