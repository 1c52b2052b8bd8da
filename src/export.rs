//! CSV export of query results.
//!
//! UTF-8 output with a header row of column names, then one record per row
//! in result order. NULL is written as an empty cell.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::info;

use crate::catalog::FlightTable;
use crate::db::QueryResult;
use crate::error::{FlightError, Result};

/// File name used when exporting an ad-hoc query result.
pub const QUERY_RESULT_FILE_NAME: &str = "query_result.csv";

/// Returns the default export file name for a table preview or a query.
pub fn default_file_name(table: Option<FlightTable>) -> String {
    match table {
        Some(table) => table.csv_file_name(),
        None => QUERY_RESULT_FILE_NAME.to_string(),
    }
}

/// Writes `result` as CSV and returns the number of data rows written.
pub fn write_csv<W: Write>(result: &QueryResult, writer: W) -> Result<u64> {
    let mut writer = csv::Writer::from_writer(writer);

    // Header even for zero rows; columns are known independently of rows
    if !result.columns.is_empty() {
        writer
            .write_record(result.column_names())
            .map_err(|e| FlightError::export(format!("Failed to write headers: {e}")))?;
    }

    let mut rows_exported: u64 = 0;
    for row in &result.rows {
        let record: Vec<String> = row.iter().map(|value| value.to_csv_field()).collect();
        writer
            .write_record(&record)
            .map_err(|e| FlightError::export(format!("Failed to write row: {e}")))?;
        rows_exported += 1;
    }

    writer
        .flush()
        .map_err(|e| FlightError::export(format!("Failed to flush writer: {e}")))?;

    Ok(rows_exported)
}

/// Encodes `result` as CSV bytes.
pub fn to_csv_bytes(result: &QueryResult) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    write_csv(result, &mut buffer)?;
    Ok(buffer)
}

/// Writes `result` to a CSV file at `path`, replacing any existing file.
pub fn export_to_file(result: &QueryResult, path: &Path) -> Result<u64> {
    let file = File::create(path).map_err(|e| {
        FlightError::export(format!("Failed to create {}: {e}", path.display()))
    })?;

    let rows = write_csv(result, BufWriter::new(file))?;
    info!(path = %path.display(), rows, "Exported CSV");
    Ok(rows)
}
