//! Error types for Flight Explorer.
//!
//! Defines the main error enum used throughout the application. Query
//! execution failures are values, never panics: every database error is
//! converted into [`FlightError::Query`] at the executor boundary.

use thiserror::Error;

/// Main error type for Flight Explorer operations.
#[derive(Error, Debug)]
pub enum FlightError {
    /// Database connection errors (host unreachable, auth failed, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution errors (syntax errors, constraint violations, missing
    /// relations, timeouts). Carries the driver's message.
    #[error("Query error: {0}")]
    Query(String),

    /// Input rejected before reaching the database (empty SQL, unknown table).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A write statement was attempted without the admin password.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Errors talking to a remote forwarder over HTTP.
    #[error("Remote error: {0}")]
    Remote(String),

    /// CSV / file export errors.
    #[error("Export error: {0}")]
    Export(String),

    /// Configuration errors (invalid config file, missing required fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal application errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl FlightError {
    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates an invalid input error with the given message.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Creates a forbidden error with the given message.
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    /// Creates a remote error with the given message.
    pub fn remote(msg: impl Into<String>) -> Self {
        Self::Remote(msg.into())
    }

    /// Creates an export error with the given message.
    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection(_) => "Connection Error",
            Self::Query(_) => "Query Error",
            Self::InvalidInput(_) => "Invalid Input",
            Self::Forbidden(_) => "Forbidden",
            Self::Remote(_) => "Remote Error",
            Self::Export(_) => "Export Error",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }

    /// Returns the bare message without the category prefix.
    ///
    /// This is what the HTTP layer embeds in `{"detail": ...}`.
    pub fn message(&self) -> &str {
        match self {
            Self::Connection(m)
            | Self::Query(m)
            | Self::InvalidInput(m)
            | Self::Forbidden(m)
            | Self::Remote(m)
            | Self::Export(m)
            | Self::Config(m)
            | Self::Internal(m) => m,
        }
    }
}

/// Result type alias using FlightError.
pub type Result<T> = std::result::Result<T, FlightError>;
