use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{Map, Value};
use tracing::info;

use crate::catalog::FlightTable;
use crate::query::{to_records, QueryExecutor};
use crate::server::{error::ApiError, AppState};

/// Returns up to 1000 rows of an allow-listed table.
pub async fn get_table_data(
    State(state): State<AppState>,
    Path(table_name): Path<String>,
) -> Result<Json<Vec<Map<String, Value>>>, ApiError> {
    let table: FlightTable = table_name.parse().map_err(|_| ApiError::TableNotFound {
        table: table_name.clone(),
        detail: "unknown table".to_string(),
    })?;

    info!(%table, "Handling table request");
    let outcome = QueryExecutor::new(state.db.as_ref())
        .preview_table(table)
        .await
        .map_err(|e| ApiError::TableNotFound {
            table: table_name.clone(),
            detail: state.client_detail(&e),
        })?;

    Ok(Json(to_records(&outcome.result)))
}
