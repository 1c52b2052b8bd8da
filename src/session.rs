//! Per-session dashboard state.
//!
//! Owned by one dashboard instance and never shared: the executor and shaper
//! stay stateless and the session remembers what the user did.

use crate::catalog::FlightTable;
use crate::db::QueryResult;

/// Queries that returned rows, oldest first.
///
/// Entries are kept verbatim with no deduplication and no cap; only the
/// display is truncated.
#[derive(Debug, Default, Clone)]
pub struct QueryHistory {
    entries: Vec<String>,
}

impl QueryHistory {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a query. Blank input is ignored.
    pub fn push(&mut self, sql: impl Into<String>) {
        let sql = sql.into();
        if sql.trim().is_empty() {
            return;
        }
        self.entries.push(sql);
    }

    /// Returns up to `n` entries, newest first.
    pub fn recent(&self, n: usize) -> Vec<&str> {
        self.entries.iter().rev().take(n).map(String::as_str).collect()
    }

    /// Total number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Where the last displayed result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultOrigin {
    /// A table preview.
    Table(FlightTable),
    /// An ad-hoc query.
    Query,
}

/// The result currently on screen.
#[derive(Debug, Clone)]
pub struct LastResult {
    pub origin: ResultOrigin,
    pub result: QueryResult,
}

impl LastResult {
    /// Default file name when this result is exported.
    pub fn csv_file_name(&self) -> String {
        match self.origin {
            ResultOrigin::Table(table) => crate::export::default_file_name(Some(table)),
            ResultOrigin::Query => crate::export::default_file_name(None),
        }
    }
}

/// State for one interactive user.
#[derive(Debug, Default)]
pub struct Session {
    pub history: QueryHistory,
    pub last_result: Option<LastResult>,
    /// Example SQL loaded with `\example`, run with `\run`.
    pub example_query: Option<String>,
    /// Set once the admin password has been entered.
    pub admin_unlocked: bool,
}

impl Session {
    /// Creates an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a table preview as the current result.
    pub fn record_table(&mut self, table: FlightTable, result: QueryResult) {
        self.last_result = Some(LastResult {
            origin: ResultOrigin::Table(table),
            result,
        });
    }

    /// Records the outcome of an ad-hoc query.
    ///
    /// Only queries that returned rows enter the history and replace the
    /// current result; empty results and writes leave both untouched.
    pub fn record_query(&mut self, sql: &str, result: QueryResult) -> bool {
        if result.is_empty() {
            return false;
        }
        self.history.push(sql);
        self.last_result = Some(LastResult {
            origin: ResultOrigin::Query,
            result,
        });
        true
    }

    /// Returns the current result, if any.
    pub fn current(&self) -> Option<&LastResult> {
        self.last_result.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{ColumnInfo, Value};
    use pretty_assertions::assert_eq;

    fn rows(n: i64) -> QueryResult {
        QueryResult::with_data(
            vec![ColumnInfo::new("n", "INT8")],
            (0..n).map(|i| vec![Value::Int(i)]).collect(),
        )
    }

    #[test]
    fn test_history_recent_newest_first() {
        let mut history = QueryHistory::new();
        for i in 1..=7 {
            history.push(format!("SELECT {i}"));
        }

        assert_eq!(
            history.recent(5),
            vec!["SELECT 7", "SELECT 6", "SELECT 5", "SELECT 4", "SELECT 3"]
        );
        // Storage is not truncated
        assert_eq!(history.len(), 7);
        assert_eq!(history.recent(100).len(), 7);
    }

    #[test]
    fn test_history_keeps_duplicates_and_text() {
        let mut history = QueryHistory::new();
        history.push("SELECT 1");
        history.push("SELECT 1");
        history.push("  select *\nfrom flights  ");
        history.push("   ");

        assert_eq!(history.len(), 3);
        assert_eq!(history.recent(1), vec!["  select *\nfrom flights  "]);
    }

    #[test]
    fn test_record_query_only_with_rows() {
        let mut session = Session::new();

        assert!(!session.record_query("SELECT * FROM incidents WHERE false", rows(0)));
        assert!(session.history.is_empty());
        assert!(session.current().is_none());

        assert!(session.record_query("SELECT * FROM incidents", rows(2)));
        assert_eq!(session.history.len(), 1);
        let current = session.current().unwrap();
        assert_eq!(current.origin, ResultOrigin::Query);
        assert_eq!(current.csv_file_name(), "query_result.csv");

        // A later empty result keeps the previous one on screen
        session.record_query("SELECT * FROM incidents WHERE false", rows(0));
        assert_eq!(session.current().unwrap().result.row_count, 2);
    }

    #[test]
    fn test_record_table() {
        let mut session = Session::new();
        session.record_table(FlightTable::Airports, rows(3));

        let current = session.current().unwrap();
        assert_eq!(current.origin, ResultOrigin::Table(FlightTable::Airports));
        assert_eq!(current.csv_file_name(), "airports.csv");
        assert!(session.history.is_empty());
    }
}
