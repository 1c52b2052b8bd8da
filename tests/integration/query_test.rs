//! Query execution against PostgreSQL.
//!
//! Requires DATABASE_URL. Statements use literal rows so no particular
//! schema needs to exist.

use flight_explorer::config::ConnectionConfig;
use flight_explorer::db::{DatabaseClient, PostgresClient, Value};
use flight_explorer::error::FlightError;
use flight_explorer::query::{shape_records, to_records, QueryExecutor};
use flight_explorer::safety::StatementKind;

/// Helper to get test database URL from environment.
fn get_test_database_url() -> Option<String> {
    std::env::var("DATABASE_URL").ok()
}

/// Helper to create a test client.
async fn get_test_client() -> Option<PostgresClient> {
    let url = get_test_database_url()?;
    let config = ConnectionConfig {
        url: Some(url),
        ..ConnectionConfig::default()
    };
    PostgresClient::connect(&config).await.ok()
}

#[tokio::test]
async fn test_select_preserves_projection_order() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let outcome = QueryExecutor::new(&client)
        .execute("SELECT 'FX100' AS flight_number, 42 AS delay, NULL::text AS gate")
        .await
        .unwrap();

    assert_eq!(outcome.kind, StatementKind::Read);
    assert_eq!(
        outcome.result.column_names(),
        vec!["flight_number", "delay", "gate"]
    );
    assert_eq!(outcome.result.rows[0][0], Value::from("FX100"));
    assert_eq!(outcome.result.rows[0][1], Value::Int(42));
    assert_eq!(outcome.result.rows[0][2], Value::Null);

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_zero_rows_is_success() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let outcome = QueryExecutor::new(&client)
        .execute("SELECT 1 AS n WHERE false")
        .await
        .unwrap();
    assert!(!outcome.has_rows());
    assert_eq!(outcome.result.column_names(), vec!["n"]);

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_multi_statement_read_runs() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let outcome = QueryExecutor::new(&client)
        .execute("SELECT 'FX100' AS flight_number; SELECT 'KLM' AS airline_code")
        .await
        .unwrap();

    assert_eq!(outcome.kind, StatementKind::Read);
    assert_eq!(outcome.result.column_names(), vec!["airline_code"]);
    assert_eq!(outcome.result.rows, vec![vec![Value::from("KLM")]]);

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_missing_relation_is_query_error() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let executor = QueryExecutor::new(&client);
    for _ in 0..20 {
        let err = executor
            .execute("SELECT * FROM flight_explorer_missing_table")
            .await
            .unwrap_err();
        assert!(matches!(err, FlightError::Query(_)));
        assert!(err.message().contains("does not exist"));
    }

    // The pool is still usable after repeated failures
    let outcome = executor.execute("SELECT 1 AS ok").await.unwrap();
    assert!(outcome.has_rows());

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_write_commits() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let executor = QueryExecutor::new(&client);
    executor
        .execute("CREATE TABLE IF NOT EXISTS flight_explorer_it (id int)")
        .await
        .unwrap();
    let outcome = executor
        .execute("INSERT INTO flight_explorer_it VALUES (1), (2)")
        .await
        .unwrap();
    assert_eq!(outcome.kind, StatementKind::Write);
    assert_eq!(outcome.result.rows_affected, Some(2));
    assert!(outcome.result.is_empty());

    let outcome = executor
        .execute("SELECT count(*) AS n FROM flight_explorer_it")
        .await
        .unwrap();
    assert!(matches!(outcome.result.rows[0][0], Value::Int(n) if n >= 2));

    executor
        .execute("DROP TABLE flight_explorer_it")
        .await
        .unwrap();
    client.close().await.unwrap();
}

#[tokio::test]
async fn test_records_round_trip_through_shaper() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let outcome = QueryExecutor::new(&client)
        .execute("SELECT * FROM (VALUES (1, 'KEF'), (2, 'LHR')) AS t(airport_id, code)")
        .await
        .unwrap();

    let records: Vec<serde_json::Value> = to_records(&outcome.result)
        .into_iter()
        .map(serde_json::Value::Object)
        .collect();
    let shaped = shape_records(&records).unwrap();

    assert_eq!(shaped.column_names(), vec!["airport_id", "code"]);
    assert_eq!(shaped.rows, outcome.result.rows);

    client.close().await.unwrap();
}
