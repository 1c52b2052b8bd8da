//! Query execution with statement classification.
//!
//! The executor is stateless: it holds a borrowed database client and turns
//! one SQL string into one [`QueryOutcome`] or one [`FlightError`].

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::catalog::FlightTable;
use crate::db::{DatabaseClient, QueryResult};
use crate::error::{FlightError, Result};
use crate::safety::{classify_sql, StatementKind};

/// Query executor that classifies SQL and routes it to the read or write path.
pub struct QueryExecutor<'a> {
    db: &'a dyn DatabaseClient,
}

impl<'a> QueryExecutor<'a> {
    /// Creates a new query executor.
    pub fn new(db: &'a dyn DatabaseClient) -> Self {
        Self { db }
    }

    /// Classifies and executes a statement.
    pub async fn execute(&self, sql: &str) -> Result<QueryOutcome> {
        let sql = reject_blank(sql)?;
        let kind = classify_sql(sql).kind;
        self.run(sql, kind).await
    }

    /// Executes a statement with the caller's declared intent.
    pub async fn execute_as(&self, sql: &str, kind: StatementKind) -> Result<QueryOutcome> {
        let sql = reject_blank(sql)?;
        self.run(sql, kind).await
    }

    /// Runs the preview statement of an allow-listed table.
    pub async fn preview_table(&self, table: FlightTable) -> Result<QueryOutcome> {
        debug!(table = %table, "Previewing table");
        self.run(table.preview_sql(), StatementKind::Read).await
    }

    async fn run(&self, sql: &str, kind: StatementKind) -> Result<QueryOutcome> {
        let start = Instant::now();
        let result = match kind {
            StatementKind::Read => self.db.execute_query(sql).await,
            StatementKind::Write => self.db.execute_statement(sql).await,
        };
        let execution_time = start.elapsed();

        match result {
            Ok(result) => {
                info!(
                    kind = %kind,
                    rows = result.row_count,
                    rows_affected = ?result.rows_affected,
                    elapsed_ms = execution_time.as_millis() as u64,
                    "Statement executed"
                );
                Ok(QueryOutcome {
                    result,
                    kind,
                    execution_time,
                })
            }
            Err(e) => {
                warn!(
                    kind = %kind,
                    elapsed_ms = execution_time.as_millis() as u64,
                    error = %e,
                    "Statement failed"
                );
                Err(into_query_error(e))
            }
        }
    }
}

/// Guards against sending empty statements to the database.
fn reject_blank(sql: &str) -> Result<&str> {
    let trimmed = sql.trim();
    if trimmed.is_empty() {
        return Err(FlightError::invalid_input("Please enter a SQL query."));
    }
    Ok(trimmed)
}

/// Keeps connection failures distinct and folds everything else into `Query`.
fn into_query_error(error: FlightError) -> FlightError {
    match error {
        FlightError::Query(_) | FlightError::Connection(_) => error,
        other => FlightError::query(other.message()),
    }
}

/// Successful query execution outcome.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    /// The query result. Empty for writes and zero-row reads.
    pub result: QueryResult,
    /// The path the statement took.
    pub kind: StatementKind,
    /// Wall-clock time including session acquisition.
    pub execution_time: Duration,
}

impl QueryOutcome {
    /// Returns true if the statement returned at least one row.
    pub fn has_rows(&self) -> bool {
        !self.result.is_empty()
    }
}
