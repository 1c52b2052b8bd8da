use axum::{extract::State, http::HeaderMap, Json};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::query::{to_records, QueryExecutor};
use crate::safety::{classify_sql, StatementKind};
use crate::server::{error::ApiError, AppState, ADMIN_PASSWORD_HEADER};

/// Body of `POST /data/execute_sql`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqlRequest {
    pub query: String,
}

/// Runs a statement and returns its rows; writes return `[]`.
///
/// Write statements need the `x-admin-password` header.
pub async fn post_execute_sql(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SqlRequest>,
) -> Result<Json<Vec<Map<String, Value>>>, ApiError> {
    if request.query.trim().is_empty() {
        return Err(ApiError::ExecutionFailed("empty query".to_string()));
    }

    let classification = classify_sql(&request.query);
    info!(
        kind = %classification.kind,
        statement = %classification.statement_type,
        "Handling SQL request"
    );

    if classification.kind == StatementKind::Write {
        let supplied = headers
            .get(ADMIN_PASSWORD_HEADER)
            .and_then(|value| value.to_str().ok());
        if !state.admin_password_matches(supplied) {
            warn!(statement = %classification.statement_type, "Rejected write without admin password");
            return Err(ApiError::Forbidden(
                "Write statements require a valid admin password".to_string(),
            ));
        }
    }

    let outcome = QueryExecutor::new(state.db.as_ref())
        .execute_as(&request.query, classification.kind)
        .await
        .map_err(|e| ApiError::ExecutionFailed(state.client_detail(&e)))?;

    Ok(Json(to_records(&outcome.result)))
}
