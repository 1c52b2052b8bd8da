//! Flight Explorer - explore a flight-operations database locally or over HTTP.
//!
//! This library exposes the core modules for the binary and for integration
//! tests.

pub mod catalog;
pub mod chart;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod export;
pub mod logging;
pub mod query;
pub mod remote;
pub mod safety;
pub mod secrets;
pub mod server;
pub mod session;
