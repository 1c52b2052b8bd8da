//! Where the dashboard gets its data: the database directly or a forwarder.

use std::sync::Arc;
use std::time::Instant;

use crate::catalog::FlightTable;
use crate::db::{DatabaseClient, QueryResult};
use crate::error::Result;
use crate::query::QueryExecutor;
use crate::remote::RemoteClient;
use crate::safety::StatementKind;

/// Backend for table previews and ad-hoc statements.
#[derive(Clone)]
pub enum DataSource {
    /// Run statements against the database.
    Local(Arc<dyn DatabaseClient>),
    /// Relay statements through a forwarder's `/data` routes.
    Remote(RemoteClient),
}

impl DataSource {
    /// Short description for the banner.
    pub fn describe(&self) -> String {
        match self {
            Self::Local(_) => "database".to_string(),
            Self::Remote(client) => format!("forwarder at {}", client.base_url()),
        }
    }

    /// Returns true for the forwarder backend.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }

    /// Loads the preview rows of `table`.
    pub async fn preview(&self, table: FlightTable) -> Result<QueryResult> {
        match self {
            Self::Local(db) => {
                let outcome = QueryExecutor::new(db.as_ref()).preview_table(table).await?;
                Ok(outcome.result.with_execution_time(outcome.execution_time))
            }
            Self::Remote(client) => {
                let start = Instant::now();
                let result = client.fetch_table(table).await?;
                Ok(result.with_execution_time(start.elapsed()))
            }
        }
    }

    /// Runs a statement already classified as `kind`.
    ///
    /// `admin_password` is forwarded to a remote backend, which checks it
    /// itself; the local backend ignores it.
    pub async fn execute(
        &self,
        sql: &str,
        kind: StatementKind,
        admin_password: Option<&str>,
    ) -> Result<QueryResult> {
        match self {
            Self::Local(db) => {
                let outcome = QueryExecutor::new(db.as_ref()).execute_as(sql, kind).await?;
                Ok(outcome.result.with_execution_time(outcome.execution_time))
            }
            Self::Remote(client) => {
                let start = Instant::now();
                let password = match kind {
                    StatementKind::Write => admin_password,
                    StatementKind::Read => None,
                };
                let result = client.execute_sql(sql, password).await?;
                Ok(result.with_execution_time(start.elapsed()))
            }
        }
    }
}
