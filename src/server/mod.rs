//! HTTP forwarder exposing the query executor.
//!
//! `GET /data/{table}` previews an allow-listed table, `POST /data/execute_sql`
//! runs a statement from a `{"query": ...}` body. Both answer with a JSON
//! array of row objects, or `{"detail": ...}` on failure.

mod error;
mod routes;

pub use error::ApiError;
pub use routes::{create_router, SqlRequest};

use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;

use tracing::{error, info};

use crate::config::Config;
use crate::db::DatabaseClient;
use crate::error::{FlightError, Result};
use crate::secrets::passwords_match;

/// Header carrying the admin password for write statements.
pub const ADMIN_PASSWORD_HEADER: &str = "x-admin-password";

/// Detail returned instead of driver text when database errors are hidden.
const GENERIC_DATABASE_ERROR: &str = "the database could not run the statement";

/// Shared state for the route handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseClient>,
    pub admin_password: Option<String>,
    pub expose_database_errors: bool,
}

impl AppState {
    /// Creates state that exposes database errors and rejects all writes.
    pub fn new(db: Arc<dyn DatabaseClient>) -> Self {
        Self {
            db,
            admin_password: None,
            expose_database_errors: true,
        }
    }

    /// Creates state from the loaded configuration.
    pub fn from_config(db: Arc<dyn DatabaseClient>, config: &Config) -> Self {
        Self {
            db,
            admin_password: config.admin.password.clone(),
            expose_database_errors: config.server.expose_database_errors,
        }
    }

    /// Sets the admin password that unlocks write statements.
    pub fn with_admin_password(mut self, password: impl Into<String>) -> Self {
        self.admin_password = Some(password.into());
        self
    }

    /// Controls whether driver error text reaches clients.
    pub fn with_expose_database_errors(mut self, expose: bool) -> Self {
        self.expose_database_errors = expose;
        self
    }

    /// Returns true if `supplied` equals the configured admin password.
    /// Always false when no password is configured.
    pub fn admin_password_matches(&self, supplied: Option<&str>) -> bool {
        supplied.is_some_and(|supplied| passwords_match(self.admin_password.as_deref(), supplied))
    }

    /// Returns the error text to send to the client.
    pub fn client_detail(&self, err: &FlightError) -> String {
        if self.expose_database_errors {
            err.message().to_string()
        } else {
            error!(category = err.category(), error = %err, "Statement failed");
            GENERIC_DATABASE_ERROR.to_string()
        }
    }
}

/// Binds `addr` and serves until Ctrl-C.
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let router = create_router(state);

    info!(%addr, "Starting forwarder");
    axum::Server::try_bind(&addr)
        .map_err(|e| FlightError::config(format!("Cannot bind {addr}: {e}")))?
        .serve(router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| FlightError::internal(format!("Server error: {e}")))
}

/// Serves on an already-bound listener until Ctrl-C.
pub async fn serve_listener(listener: TcpListener, state: AppState) -> Result<()> {
    let router = create_router(state);

    info!(addr = ?listener.local_addr().ok(), "Starting forwarder");
    axum::Server::from_tcp(listener)
        .map_err(|e| FlightError::config(format!("Cannot use listener: {e}")))?
        .serve(router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| FlightError::internal(format!("Server error: {e}")))
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down forwarder");
    }
}
