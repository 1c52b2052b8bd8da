//! Mock database client for testing.
//!
//! Serves canned results keyed by SQL text and records every statement it
//! receives, along with how many sessions are currently open.

use super::{DatabaseClient, QueryResult};
use crate::error::{FlightError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
enum MockResponse {
    Rows(QueryResult),
    Affected(u64),
    Fail(String),
}

/// A mock database client that returns predefined results.
#[derive(Debug, Default)]
pub struct MockDatabaseClient {
    responses: Mutex<HashMap<String, MockResponse>>,
    executed: Mutex<Vec<String>>,
    open_sessions: AtomicUsize,
    sessions_opened: AtomicUsize,
}

/// Marks a session open for the lifetime of one call.
struct SessionGuard<'a>(&'a AtomicUsize);

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockDatabaseClient {
    /// Creates a new mock database client with no registered responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the rows returned for `sql`.
    pub fn with_result(self, sql: &str, result: QueryResult) -> Self {
        self.insert(sql, MockResponse::Rows(result));
        self
    }

    /// Registers the number of rows a write statement affects.
    pub fn with_rows_affected(self, sql: &str, rows_affected: u64) -> Self {
        self.insert(sql, MockResponse::Affected(rows_affected));
        self
    }

    /// Registers a driver error message for `sql`.
    pub fn with_error(self, sql: &str, message: &str) -> Self {
        self.insert(sql, MockResponse::Fail(message.to_string()));
        self
    }

    /// Returns every statement received, in order.
    pub fn executed_statements(&self) -> Vec<String> {
        self.executed
            .lock()
            .map(|executed| executed.clone())
            .unwrap_or_default()
    }

    /// Returns the number of sessions currently held open.
    pub fn open_sessions(&self) -> usize {
        self.open_sessions.load(Ordering::SeqCst)
    }

    /// Returns the number of sessions opened since creation.
    pub fn sessions_opened(&self) -> usize {
        self.sessions_opened.load(Ordering::SeqCst)
    }

    fn insert(&self, sql: &str, response: MockResponse) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.insert(normalize_sql(sql), response);
        }
    }

    fn open_session(&self, sql: &str) -> SessionGuard<'_> {
        self.open_sessions.fetch_add(1, Ordering::SeqCst);
        self.sessions_opened.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut executed) = self.executed.lock() {
            executed.push(sql.to_string());
        }
        SessionGuard(&self.open_sessions)
    }

    fn lookup(&self, sql: &str) -> Option<MockResponse> {
        self.responses
            .lock()
            .ok()
            .and_then(|responses| responses.get(&normalize_sql(sql)).cloned())
    }
}

/// Collapses whitespace and trailing semicolons so lookups ignore layout.
fn normalize_sql(sql: &str) -> String {
    sql.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(';')
        .trim_end()
        .to_string()
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        let _session = self.open_session(sql);

        match self.lookup(sql) {
            Some(MockResponse::Rows(result)) => {
                Ok(result.with_execution_time(Duration::from_millis(1)))
            }
            Some(MockResponse::Affected(_)) => Ok(QueryResult::new()),
            Some(MockResponse::Fail(message)) => Err(FlightError::query(message)),
            None => Err(FlightError::query(format!(
                "no mock result registered for: {sql}"
            ))),
        }
    }

    async fn execute_statement(&self, sql: &str) -> Result<QueryResult> {
        let _session = self.open_session(sql);

        match self.lookup(sql) {
            Some(MockResponse::Fail(message)) => Err(FlightError::query(message)),
            Some(MockResponse::Affected(n)) => Ok(QueryResult::from_write(n)),
            _ => Ok(QueryResult::from_write(0)),
        }
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
