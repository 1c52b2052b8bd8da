//! PostgreSQL database client implementation.
//!
//! Provides the `PostgresClient` struct that implements the `DatabaseClient` trait
//! for PostgreSQL databases using sqlx.

use crate::config::ConnectionConfig;
use crate::db::{ColumnInfo, DatabaseClient, QueryResult, Row, Value};
use crate::error::{FlightError, Result};
use crate::safety::{classify_sql, StatementType};
use async_trait::async_trait;
use futures::TryStreamExt;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::pool::PoolConnection;
use sqlx::postgres::types::{PgInterval, PgMoney, PgTimeTz};
use sqlx::postgres::{PgConnection, PgPool, PgPoolOptions, PgRow, PgValueFormat};
use sqlx::{
    Column as SqlxColumn, Decode, Either, Executor, Postgres, Row as SqlxRow, Type, TypeInfo,
    ValueRef,
};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// How long to wait for a pooled connection before giving up.
const ACQUIRE_TIMEOUT_SECS: u64 = 10;

/// PostgreSQL database client.
#[derive(Debug)]
pub struct PostgresClient {
    pool: PgPool,
    query_timeout: Option<Duration>,
}

impl PostgresClient {
    /// Creates a new PostgresClient from an existing connection pool.
    ///
    /// This is primarily useful for testing.
    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            query_timeout: None,
        }
    }

    /// Connects to the database described by `config`.
    ///
    /// A single attempt is made; connection errors are mapped to
    /// user-facing messages.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let conn_str = config.to_connection_string()?;

        debug!("Connecting to {}", config.display_string());
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .acquire_timeout(Duration::from_secs(ACQUIRE_TIMEOUT_SECS))
            .connect(&conn_str)
            .await
            .map_err(|e| map_connection_error(e, config))?;

        let query_timeout = match config.query_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        Ok(Self {
            pool,
            query_timeout,
        })
    }

    /// Sets the per-statement timeout.
    pub fn with_query_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Runs several statements over the simple query protocol and keeps the
    /// rows of the last one.
    async fn execute_batch(
        &self,
        conn: &mut PoolConnection<Postgres>,
        sql: &str,
    ) -> Result<Vec<PgRow>> {
        let batch = async {
            let mut stream = (&mut *conn).fetch_many(sqlx::raw_sql(sql));
            let mut last = Vec::new();
            let mut current = Vec::new();
            while let Some(item) = stream.try_next().await? {
                match item {
                    Either::Left(_) => last = std::mem::take(&mut current),
                    Either::Right(row) => current.push(row),
                }
            }
            if !current.is_empty() {
                last = current;
            }
            Ok::<_, sqlx::Error>(last)
        };

        let outcome = match self.query_timeout {
            Some(limit) => {
                let timed = tokio::time::timeout(limit, batch).await;
                match timed {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        conn.close_on_drop();
                        return Err(timed_out(limit));
                    }
                }
            }
            None => batch.await,
        };
        outcome.map_err(|e| FlightError::query(format_query_error(e)))
    }
}

#[async_trait]
impl DatabaseClient for PostgresClient {
    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        let start = Instant::now();

        // The pooled connection goes back to the pool when `conn` drops,
        // on success and on every error path below.
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| FlightError::query(format_query_error(e)))?;

        // Prepared statements reject multiple commands
        if matches!(classify_sql(sql).statement_type, StatementType::Multiple(_)) {
            let rows = self.execute_batch(&mut conn, sql).await?;
            let columns = rows.first().map(column_info).unwrap_or_default();
            let rows: Vec<Row> = rows.iter().map(convert_row).collect();
            return Ok(QueryResult::with_data(columns, rows).with_execution_time(start.elapsed()));
        }

        let fut = sqlx::query(sql).persistent(false).fetch_all(&mut *conn);
        let outcome = match self.query_timeout {
            Some(limit) => {
                let timed = tokio::time::timeout(limit, fut).await;
                match timed {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        // The server may still be running the statement
                        conn.close_on_drop();
                        return Err(timed_out(limit));
                    }
                }
            }
            None => fut.await,
        };
        let result = outcome.map_err(|e| FlightError::query(format_query_error(e)))?;

        let execution_time = start.elapsed();

        let columns: Vec<ColumnInfo> = match result.first() {
            Some(first_row) => column_info(first_row),
            None => describe_columns(&mut conn, sql).await,
        };

        let rows: Vec<Row> = result.iter().map(convert_row).collect();

        Ok(QueryResult::with_data(columns, rows).with_execution_time(execution_time))
    }

    async fn execute_statement(&self, sql: &str) -> Result<QueryResult> {
        let start = Instant::now();

        // Dropping an uncommitted transaction rolls it back and releases
        // the connection.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| FlightError::query(format_query_error(e)))?;

        let fut = (&mut *tx).execute(sqlx::raw_sql(sql));
        let outcome = match self.query_timeout {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .map_err(|_| timed_out(limit))?,
            None => fut.await,
        };
        let outcome = outcome.map_err(|e| FlightError::query(format_query_error(e)))?;

        tx.commit()
            .await
            .map_err(|e| FlightError::query(format_query_error(e)))?;

        Ok(QueryResult::from_write(outcome.rows_affected()).with_execution_time(start.elapsed()))
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

fn timed_out(limit: Duration) -> FlightError {
    FlightError::query(format!(
        "Query timed out after {} seconds",
        limit.as_secs()
    ))
}

/// Extracts column metadata from a row.
fn column_info(row: &PgRow) -> Vec<ColumnInfo> {
    row.columns()
        .iter()
        .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
        .collect()
}

/// Asks the server to describe a statement so a zero-row result still
/// reports its projection.
async fn describe_columns(conn: &mut PgConnection, sql: &str) -> Vec<ColumnInfo> {
    match conn.describe(sql).await {
        Ok(described) => described
            .columns()
            .iter()
            .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
            .collect(),
        Err(e) => {
            warn!("Could not describe empty result: {e}");
            Vec::new()
        }
    }
}

/// Converts a sqlx PgRow to our Row type.
fn convert_row(row: &PgRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

/// Converts a single column value from a PgRow to our Value type.
///
/// Types without a dedicated decoder keep the server's own rendering.
fn convert_value(row: &PgRow, index: usize, type_name: &str) -> Value {
    decode_typed(row, index, type_name).unwrap_or_else(|| decode_raw(row, index))
}

/// Decodes `T`, mapping SQL NULL to `Value::Null`. `None` if `T` does not fit.
fn decode<T>(row: &PgRow, index: usize, convert: impl FnOnce(T) -> Value) -> Option<Value>
where
    T: for<'r> Decode<'r, Postgres> + Type<Postgres>,
{
    row.try_get::<Option<T>, _>(index)
        .ok()
        .map(|value| value.map(convert).unwrap_or(Value::Null))
}

fn decimal_value(d: Decimal) -> Value {
    match d.to_f64() {
        Some(f) => Value::Float(f),
        None => Value::String(d.to_string()),
    }
}

fn decode_typed(row: &PgRow, index: usize, type_name: &str) -> Option<Value> {
    match type_name.to_uppercase().as_str() {
        "BOOL" | "BOOLEAN" => decode(row, index, Value::Bool),
        "INT2" | "SMALLINT" => decode(row, index, |v: i16| Value::Int(i64::from(v))),
        "INT4" | "INT" | "INTEGER" => decode(row, index, |v: i32| Value::Int(i64::from(v))),
        "INT8" | "BIGINT" => decode(row, index, Value::Int),
        "OID" => decode(row, index, |v: sqlx::postgres::types::Oid| Value::Int(i64::from(v.0))),
        "FLOAT4" | "REAL" => decode(row, index, |v: f32| Value::Float(f64::from(v))),
        "FLOAT8" | "DOUBLE PRECISION" => decode(row, index, Value::Float),
        "NUMERIC" | "DECIMAL" => decode(row, index, decimal_value),
        "MONEY" => decode(row, index, |m: PgMoney| decimal_value(m.to_decimal(2))),
        "DATE" => decode(row, index, |d: chrono::NaiveDate| {
            Value::String(d.format("%Y-%m-%d").to_string())
        }),
        "TIME" => decode(row, index, |t: chrono::NaiveTime| {
            Value::String(t.format("%H:%M:%S%.f").to_string())
        }),
        "TIMETZ" => decode(
            row,
            index,
            |t: PgTimeTz<chrono::NaiveTime, chrono::FixedOffset>| {
                Value::String(format!("{}{}", t.time.format("%H:%M:%S%.f"), t.offset))
            },
        ),
        "TIMESTAMP" => decode(row, index, |dt: chrono::NaiveDateTime| {
            Value::String(dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
        }),
        "TIMESTAMPTZ" => decode(row, index, |dt: chrono::DateTime<chrono::Utc>| {
            Value::String(dt.to_rfc3339())
        }),
        "INTERVAL" => decode(row, index, |iv: PgInterval| Value::String(format_interval(&iv))),
        "UUID" => decode(row, index, |u: uuid::Uuid| Value::String(u.to_string())),
        "JSON" | "JSONB" => decode(row, index, |j: serde_json::Value| {
            Value::String(j.to_string())
        }),
        "BYTEA" => decode(row, index, Value::Bytes),
        _ => decode(row, index, Value::String),
    }
}

/// Last resort: the raw wire value, as text when the server sent text.
fn decode_raw(row: &PgRow, index: usize) -> Value {
    let Ok(raw) = row.try_get_raw(index) else {
        return Value::Null;
    };
    if raw.is_null() {
        return Value::Null;
    }

    match raw.format() {
        PgValueFormat::Text => raw
            .as_str()
            .map(|s| Value::String(s.to_string()))
            .unwrap_or(Value::Null),
        PgValueFormat::Binary => raw
            .as_bytes()
            .map(|b| Value::Bytes(b.to_vec()))
            .unwrap_or(Value::Null),
    }
}

/// Renders an interval the way PostgreSQL's default output style does,
/// e.g. `1 year 2 mons 3 days 04:05:06.5`.
fn format_interval(interval: &PgInterval) -> String {
    fn unit(n: i64, singular: &str, plural: &str) -> String {
        format!("{n} {}", if n.abs() == 1 { singular } else { plural })
    }

    let mut parts = Vec::new();
    let years = i64::from(interval.months / 12);
    let months = i64::from(interval.months % 12);
    if years != 0 {
        parts.push(unit(years, "year", "years"));
    }
    if months != 0 {
        parts.push(unit(months, "mon", "mons"));
    }
    if interval.days != 0 {
        parts.push(unit(i64::from(interval.days), "day", "days"));
    }

    if interval.microseconds != 0 || parts.is_empty() {
        let sign = if interval.microseconds < 0 { "-" } else { "" };
        let micros = interval.microseconds.unsigned_abs();
        let secs = micros / 1_000_000;
        let mut clock = format!(
            "{sign}{:02}:{:02}:{:02}",
            secs / 3600,
            (secs / 60) % 60,
            secs % 60
        );
        let fraction = micros % 1_000_000;
        if fraction != 0 {
            let digits = format!("{fraction:06}");
            clock.push('.');
            clock.push_str(digits.trim_end_matches('0'));
        }
        parts.push(clock);
    }

    parts.join(" ")
}

/// Maps sqlx connection errors to user-friendly messages.
fn map_connection_error(error: sqlx::Error, config: &ConnectionConfig) -> FlightError {
    let target = config.display_string();
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") || error_str.contains("could not connect") {
        FlightError::connection(format!(
            "Cannot connect to {target}. Check that the server is running."
        ))
    } else if error_str.contains("password authentication failed")
        || error_str.contains("authentication failed")
    {
        FlightError::connection(format!(
            "Authentication failed for {target}. Check your credentials."
        ))
    } else if error_str.contains("does not exist") && error_str.contains("database") {
        FlightError::connection(format!("Database for {target} does not exist."))
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        FlightError::connection(format!(
            "Connection to {target} timed out. The server may be overloaded or unreachable."
        ))
    } else {
        FlightError::connection(error.to_string())
    }
}

/// Formats a query error, keeping the driver's message and any detail/hint.
fn format_query_error(error: sqlx::Error) -> String {
    let Some(db_error) = error.as_database_error() else {
        return error.to_string();
    };

    let mut result = String::from(db_error.message());

    if let Some(pg_error) = db_error.try_downcast_ref::<sqlx::postgres::PgDatabaseError>() {
        if let Some(detail) = pg_error.detail() {
            result.push_str("\nDETAIL: ");
            result.push_str(detail);
        }
        if let Some(hint) = pg_error.hint() {
            result.push_str("\nHINT: ");
            result.push_str(hint);
        }
    }

    result
}
