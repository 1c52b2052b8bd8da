//! Forwarder round trips over real HTTP.
//!
//! A server backed by the mock database listens on an ephemeral port and is
//! queried through `RemoteClient` and the dashboard's remote data source.

use std::net::TcpListener;
use std::sync::Arc;

use flight_explorer::catalog::FlightTable;
use flight_explorer::dashboard::{Dashboard, DashboardSettings, DataSource, Output};
use flight_explorer::db::{ColumnInfo, DatabaseClient, MockDatabaseClient, QueryResult, Value};
use flight_explorer::error::FlightError;
use flight_explorer::query::{shape_records, to_records, QueryExecutor};
use flight_explorer::remote::RemoteClient;
use flight_explorer::server::{serve_listener, AppState};
use pretty_assertions::assert_eq;

const FLIGHTS_SQL: &str = "SELECT * FROM flights LIMIT 1000";
const DELETE_SQL: &str = "DELETE FROM baggage WHERE baggage_id = -1";

fn flights() -> QueryResult {
    QueryResult::with_data(
        vec![
            ColumnInfo::new("flight_id", "INT4"),
            ColumnInfo::new("flight_number", "TEXT"),
            ColumnInfo::new("delay_minutes", "FLOAT8"),
            ColumnInfo::new("flight_status", "TEXT"),
        ],
        vec![
            vec![
                Value::Int(1),
                Value::from("FX100"),
                Value::Float(12.5),
                Value::from("Delayed"),
            ],
            vec![Value::Int(2), Value::from("FX200"), Value::Null, Value::Null],
        ],
    )
}

/// Starts a forwarder and returns its base URL.
fn start_forwarder(mock: &Arc<MockDatabaseClient>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let db: Arc<dyn DatabaseClient> = mock.clone();
    let state = AppState::new(db).with_admin_password("secret");
    tokio::spawn(serve_listener(listener, state));

    format!("http://{addr}")
}

#[tokio::test]
async fn test_fetch_table_matches_direct_execution() {
    let mock = Arc::new(MockDatabaseClient::new().with_result(FLIGHTS_SQL, flights()));
    let client = RemoteClient::new(&start_forwarder(&mock)).unwrap();

    let remote = client.fetch_table(FlightTable::Flights).await.unwrap();

    let direct = QueryExecutor::new(mock.as_ref())
        .execute(FLIGHTS_SQL)
        .await
        .unwrap();
    let records: Vec<serde_json::Value> = to_records(&direct.result)
        .into_iter()
        .map(serde_json::Value::Object)
        .collect();
    let expected = shape_records(&records).unwrap();

    assert_eq!(
        remote.column_names(),
        vec!["flight_id", "flight_number", "delay_minutes", "flight_status"]
    );
    assert_eq!(remote.rows, expected.rows);
    assert_eq!(remote.rows[1][3], Value::Null);
}

#[tokio::test]
async fn test_unknown_table_is_404() {
    let mock = Arc::new(MockDatabaseClient::new());
    let base = start_forwarder(&mock);

    let response = reqwest::get(format!("{base}/data/pilots")).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(
        body["detail"],
        "Table `pilots` not found or error: unknown table"
    );
    assert!(mock.executed_statements().is_empty());
}

#[tokio::test]
async fn test_execute_sql_error_carries_detail() {
    let mock = Arc::new(
        MockDatabaseClient::new().with_error("SELECT * FROM nope", "relation \"nope\" does not exist"),
    );
    let client = RemoteClient::new(&start_forwarder(&mock)).unwrap();

    let err = client
        .execute_sql("SELECT * FROM nope", None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        FlightError::Remote(ref m) if m == "Failed to execute SQL query: relation \"nope\" does not exist"
    ));
}

#[tokio::test]
async fn test_remote_writes_need_password() {
    let mock = Arc::new(MockDatabaseClient::new());
    let client = RemoteClient::new(&start_forwarder(&mock)).unwrap();

    let err = client.execute_sql(DELETE_SQL, None).await.unwrap_err();
    assert!(matches!(err, FlightError::Forbidden(_)));
    let err = client
        .execute_sql(DELETE_SQL, Some("guess"))
        .await
        .unwrap_err();
    assert!(matches!(err, FlightError::Forbidden(_)));
    assert!(mock.executed_statements().is_empty());

    let result = client
        .execute_sql(DELETE_SQL, Some("secret"))
        .await
        .unwrap();
    assert!(result.is_empty());
    assert_eq!(mock.executed_statements(), vec![DELETE_SQL.to_string()]);
}

#[tokio::test]
async fn test_dashboard_over_forwarder() {
    let mock = Arc::new(MockDatabaseClient::new().with_result(FLIGHTS_SQL, flights()));
    let client = RemoteClient::new(&start_forwarder(&mock)).unwrap();
    let mut dashboard = Dashboard::new(DataSource::Remote(client), DashboardSettings::default());

    let output = dashboard.handle_line("\\table flights").await;
    assert!(output
        .plain_text()
        .starts_with("`flights` loaded with 2 rows\n"));

    let output = dashboard.handle_line("\\search delayed").await;
    assert!(output.plain_text().starts_with("1 result(s) found.\n"));

    // Unlocked locally, but the forwarder rejects the wrong password
    dashboard.handle_line("\\admin guess").await;
    let output = dashboard.handle_line(DELETE_SQL).await;
    assert!(matches!(output, Output::Error(ref m) if m.starts_with("Query failed:")));

    dashboard.handle_line("\\admin secret").await;
    let output = dashboard.handle_line(DELETE_SQL).await;
    assert_eq!(output, Output::success("Statement executed."));
    assert_eq!(mock.executed_statements().len(), 2);
}
