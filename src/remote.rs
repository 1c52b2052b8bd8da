//! HTTP client for a remote query forwarder.
//!
//! Lets the dashboard and CLI run against a `flight-explorer serve` instance
//! instead of connecting to the database directly.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use url::Url;

use crate::catalog::FlightTable;
use crate::db::QueryResult;
use crate::error::{FlightError, Result};
use crate::query::shape_records;
use crate::server::ADMIN_PASSWORD_HEADER;

/// Default timeout for forwarder requests.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Error body returned by the forwarder.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: String,
}

/// Client for the `/data` routes of a forwarder.
#[derive(Debug, Clone)]
pub struct RemoteClient {
    base_url: Url,
    client: Client,
}

impl RemoteClient {
    /// Creates a client for the forwarder at `base_url`.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a client with a custom request timeout.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| FlightError::config(format!("Invalid remote URL '{base_url}': {e}")))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(FlightError::config(format!(
                "Remote URL must use http or https, got '{}'",
                base_url.scheme()
            )));
        }
        // Join treats the last path segment as a file unless it ends in '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FlightError::remote(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { base_url, client })
    }

    /// Returns the forwarder base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetches the preview rows of a table.
    pub async fn fetch_table(&self, table: FlightTable) -> Result<QueryResult> {
        let url = self.endpoint(&format!("data/{}", table.as_str()))?;
        debug!(%url, "Fetching table from forwarder");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FlightError::remote(format!("Request failed: {e}")))?;

        Self::read_records(response).await
    }

    /// Sends a statement to the forwarder.
    ///
    /// The admin password is only needed for write statements.
    pub async fn execute_sql(&self, query: &str, admin_password: Option<&str>) -> Result<QueryResult> {
        let url = self.endpoint("data/execute_sql")?;
        debug!(%url, "Sending statement to forwarder");

        let mut request = self.client.post(url).json(&json!({ "query": query }));
        if let Some(password) = admin_password {
            request = request.header(ADMIN_PASSWORD_HEADER, password);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FlightError::remote(format!("Request failed: {e}")))?;

        Self::read_records(response).await
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| FlightError::remote(format!("Invalid endpoint '{path}': {e}")))
    }

    async fn read_records(response: reqwest::Response) -> Result<QueryResult> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| FlightError::remote(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(Self::parse_error(status, &body));
        }

        let records: Vec<serde_json::Value> = serde_json::from_str(&body)
            .map_err(|e| FlightError::remote(format!("Unexpected response body: {e}")))?;
        shape_records(&records)
    }

    /// Maps a non-2xx response to an error, keeping the server's detail text.
    fn parse_error(status: StatusCode, body: &str) -> FlightError {
        let detail = serde_json::from_str::<ErrorBody>(body)
            .map(|b| b.detail)
            .unwrap_or_else(|_| body.trim().to_string());

        match status {
            StatusCode::FORBIDDEN => FlightError::forbidden(detail),
            _ if detail.is_empty() => FlightError::remote(format!("HTTP {status}")),
            _ => FlightError::remote(detail),
        }
    }
}
