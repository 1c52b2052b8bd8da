//! Result shaping between tabular results and column-keyed JSON records.
//!
//! The HTTP forwarder answers with an array of row objects; the dashboard,
//! CSV export and charts work on [`QueryResult`]. These two functions convert
//! between the two without coercing values.

use serde_json::{Map, Value as JsonValue};

use crate::db::{ColumnInfo, QueryResult, Row, Value};
use crate::error::{FlightError, Result};

/// Shapes column-keyed row objects into a [`QueryResult`].
///
/// Column order follows the key order of the first row, then any keys first
/// seen in later rows. Missing keys become `Null`.
pub fn shape_records(records: &[JsonValue]) -> Result<QueryResult> {
    let mut objects = Vec::with_capacity(records.len());
    for (i, record) in records.iter().enumerate() {
        match record {
            JsonValue::Object(map) => objects.push(map),
            other => {
                return Err(FlightError::invalid_input(format!(
                    "row {i} is not an object: {other}"
                )))
            }
        }
    }

    let mut names: Vec<&str> = Vec::new();
    for object in objects.iter().copied() {
        for key in object.keys() {
            if !names.contains(&key.as_str()) {
                names.push(key.as_str());
            }
        }
    }

    let rows: Vec<Row> = objects
        .iter()
        .map(|object| {
            names
                .iter()
                .map(|name| object.get(*name).map(Value::from_json).unwrap_or(Value::Null))
                .collect()
        })
        .collect();

    let columns = names
        .iter()
        .enumerate()
        .map(|(i, name)| ColumnInfo::new(*name, infer_type(&rows, i)))
        .collect();

    Ok(QueryResult::with_data(columns, rows))
}

/// Converts a [`QueryResult`] into row objects keyed by column name.
pub fn to_records(result: &QueryResult) -> Vec<Map<String, JsonValue>> {
    result
        .rows
        .iter()
        .map(|row| {
            result
                .columns
                .iter()
                .zip(row.iter())
                .map(|(column, value)| (column.name.clone(), value.to_json()))
                .collect()
        })
        .collect()
}

/// Names the type of the first non-null value in a column.
fn infer_type(rows: &[Row], index: usize) -> &'static str {
    let first = rows
        .iter()
        .filter_map(|row| row.get(index))
        .find(|value| !value.is_null());

    match first {
        Some(Value::Bool(_)) => "BOOL",
        Some(Value::Int(_)) => "INT8",
        Some(Value::Float(_)) => "FLOAT8",
        Some(Value::Bytes(_)) => "BYTEA",
        Some(Value::String(_)) | Some(Value::Null) | None => "TEXT",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_shape_preserves_key_order() {
        let records = vec![
            json!({"flight_number": "FX100", "delay_minutes": 42, "airline": "Fly"}),
            json!({"flight_number": "FX200", "delay_minutes": 0, "airline": "Fly"}),
        ];
        let result = shape_records(&records).unwrap();

        assert_eq!(
            result.column_names(),
            vec!["flight_number", "delay_minutes", "airline"]
        );
        assert_eq!(result.rows[0][1], Value::Int(42));
        assert_eq!(result.numeric_columns(), vec!["delay_minutes"]);
    }

    #[test]
    fn test_shape_zero_rows() {
        let result = shape_records(&[]).unwrap();
        assert!(result.is_empty());
        assert!(result.columns.is_empty());
        assert!(to_records(&result).is_empty());
    }

    #[test]
    fn test_shape_missing_keys_become_null() {
        let records = vec![json!({"a": 1}), json!({"a": 2, "b": "late"})];
        let result = shape_records(&records).unwrap();

        assert_eq!(result.column_names(), vec!["a", "b"]);
        assert_eq!(result.rows[0][1], Value::Null);
        assert_eq!(result.rows[1][1], Value::from("late"));
    }

    #[test]
    fn test_shape_rejects_non_objects() {
        let err = shape_records(&[json!([1, 2])]).unwrap_err();
        assert!(matches!(err, FlightError::InvalidInput(_)));
    }

    #[test]
    fn test_to_records_in_column_order() {
        let result = QueryResult::with_data(
            vec![ColumnInfo::new("b", "TEXT"), ColumnInfo::new("a", "INT4")],
            vec![vec![Value::from("x"), Value::Int(1)]],
        );
        let records = to_records(&result);

        let keys: Vec<&String> = records[0].keys().collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(
            serde_json::to_string(&records).unwrap(),
            r#"[{"b":"x","a":1}]"#
        );
    }

    #[test]
    fn test_records_shape_back_to_same_values() {
        let records = vec![json!({"a": 1, "b": "x"}), json!({"a": 2, "b": "y"})];
        let result = shape_records(&records).unwrap();
        let back: Vec<JsonValue> = to_records(&result).into_iter().map(JsonValue::Object).collect();
        assert_eq!(back, records);
    }
}
