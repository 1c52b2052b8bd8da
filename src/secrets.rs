//! Secret lookup backed by the OS keyring.
//!
//! The database connection string and the admin password are secrets. They
//! may come from the config file or the environment; when neither supplies
//! them, the OS keyring is consulted.

use crate::config::Config;
use crate::error::{FlightError, Result};
use keyring::Entry;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

const SERVICE_NAME: &str = "flight-explorer";

/// The secrets Flight Explorer knows how to look up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretKey {
    /// Full PostgreSQL connection string.
    DatabaseUrl,
    /// Shared secret gating write statements.
    AdminPassword,
}

impl SecretKey {
    /// Returns the keyring account name for this secret.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DatabaseUrl => "database-url",
            Self::AdminPassword => "admin-password",
        }
    }
}

impl fmt::Display for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SecretKey {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "database-url" | "db-url" => Ok(Self::DatabaseUrl),
            "admin-password" | "admin" => Ok(Self::AdminPassword),
            _ => Err(format!(
                "Unknown secret '{s}'. Expected: database-url or admin-password"
            )),
        }
    }
}

/// Reads and writes secrets in the OS keyring.
#[derive(Debug, Clone, Default)]
pub struct SecretStorage;

impl SecretStorage {
    /// Creates a new secret storage handle.
    pub fn new() -> Self {
        Self
    }

    /// Stores a secret in the keyring.
    pub fn store(&self, key: SecretKey, secret: &str) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, key.as_str())
            .map_err(|e| FlightError::config(format!("Failed to create keyring entry: {e}")))?;

        entry
            .set_password(secret)
            .map_err(|e| FlightError::config(format!("Failed to store secret: {e}")))?;

        Ok(())
    }

    /// Retrieves a secret from the keyring.
    ///
    /// An unavailable keyring is treated the same as a missing entry.
    pub fn retrieve(&self, key: SecretKey) -> Option<String> {
        let entry = match Entry::new(SERVICE_NAME, key.as_str()) {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Keyring unavailable: {e}");
                return None;
            }
        };

        match entry.get_password() {
            Ok(secret) => Some(secret),
            Err(keyring::Error::NoEntry) => None,
            Err(e) => {
                warn!("Failed to read {key} from keyring: {e}");
                None
            }
        }
    }

    /// Fills secrets the config still lacks from the keyring.
    pub fn fill_missing(&self, config: &mut Config) {
        if !config.database.is_configured() {
            if let Some(url) = self.retrieve(SecretKey::DatabaseUrl) {
                debug!("Using database URL from keyring");
                config.database.url = Some(url);
            }
        }
        if config.admin.password.is_none() {
            config.admin.password = self.retrieve(SecretKey::AdminPassword);
        }
    }

    /// Masks a secret for display, showing only the last 4 characters.
    pub fn mask_secret(secret: &str) -> String {
        let chars: Vec<char> = secret.chars().collect();
        if chars.len() <= 4 {
            "*".repeat(chars.len())
        } else {
            let tail: String = chars[chars.len() - 4..].iter().collect();
            format!("{}...{}", "*".repeat(4), tail)
        }
    }
}

/// Compares a supplied password with the configured one.
///
/// Always false when no password is configured or it is empty. The
/// comparison time does not depend on where the strings differ.
pub fn passwords_match(expected: Option<&str>, supplied: &str) -> bool {
    match expected {
        Some(expected) if !expected.is_empty() => {
            let (a, b) = (expected.as_bytes(), supplied.as_bytes());
            a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
        }
        _ => false,
    }
}
