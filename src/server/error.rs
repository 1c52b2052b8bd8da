use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::warn;

/// Error returned by the forwarder routes as `{"detail": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    /// Table preview failed or the table is not allow-listed (404).
    TableNotFound { table: String, detail: String },
    /// Ad-hoc statement failed (400).
    ExecutionFailed(String),
    /// Write statement without a valid admin password (403).
    Forbidden(String),
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::TableNotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::ExecutionFailed(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }

    pub fn detail(&self) -> String {
        match self {
            ApiError::TableNotFound { table, detail } => {
                format!("Table `{table}` not found or error: {detail}")
            }
            ApiError::ExecutionFailed(detail) => {
                format!("Failed to execute SQL query: {detail}")
            }
            ApiError::Forbidden(detail) => detail.clone(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = self.detail();

        warn!(%status, %detail, "Returning error");
        (status, Json(ErrorBody { detail })).into_response()
    }
}
