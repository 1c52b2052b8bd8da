//! Logging configuration for Flight Explorer.
//!
//! The interactive dashboard logs to a file so log lines never interleave
//! with rendered tables; the server and one-shot commands log to stderr.

use std::fs::{self, File};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initializes logging for the interactive dashboard.
///
/// Location: `~/.local/state/flight-explorer/flight-explorer.log` on Linux
/// (XDG state directory), or the platform-appropriate directory elsewhere.
pub fn init_file_logging() {
    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            eprintln!("Warning: Could not create log directory: {e}");
            return;
        }
    }

    // Truncate on each run to avoid unbounded growth
    let log_file = match File::create(&log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not create log file: {e}");
            return;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(log_file)
        .with_ansi(false)
        .init();
}

/// Initializes logging to stderr for the server and one-shot commands.
pub fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();
}

/// Returns the path for the dashboard log file.
pub fn get_log_path() -> PathBuf {
    if let Some(state_dir) = dirs::state_dir() {
        return state_dir.join("flight-explorer").join("flight-explorer.log");
    }

    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("flight-explorer").join("flight-explorer.log");
    }

    std::env::temp_dir().join("flight-explorer.log")
}
