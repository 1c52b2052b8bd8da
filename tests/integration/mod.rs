//! Integration tests for Flight Explorer.

pub mod forwarder_test;
pub mod query_test;
