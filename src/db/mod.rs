//! Database abstraction layer for Flight Explorer.
//!
//! Provides a trait-based interface for statement execution so the executor,
//! the HTTP forwarder and the dashboard can run against PostgreSQL or the
//! in-memory mock interchangeably.

mod mock;
mod postgres;
mod types;

pub use mock::MockDatabaseClient;
pub use postgres::PostgresClient;
pub use types::{ColumnInfo, QueryResult, Row, Value};

use crate::config::ConnectionConfig;
use crate::error::Result;
use async_trait::async_trait;

/// Creates a database client for the given configuration.
pub async fn connect(config: &ConnectionConfig) -> Result<Box<dyn DatabaseClient>> {
    let client = PostgresClient::connect(config).await?;
    Ok(Box::new(client))
}

/// Trait defining the interface for database clients.
///
/// Each call acquires its own session and releases it before returning,
/// whether the statement succeeded or failed.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Executes a read statement and materializes every returned row.
    async fn execute_query(&self, sql: &str) -> Result<QueryResult>;

    /// Executes a write statement in a transaction and commits it.
    ///
    /// Returns an empty result carrying the number of rows affected.
    async fn execute_statement(&self, sql: &str) -> Result<QueryResult>;

    /// Closes the database connection.
    async fn close(&self) -> Result<()>;
}
