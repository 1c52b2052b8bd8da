//! Query execution and result shaping for Flight Explorer.
//!
//! Both halves are stateless; session state lives in [`crate::session`].

pub mod executor;
pub mod shaper;

pub use executor::{QueryExecutor, QueryOutcome};
pub use shaper::{shape_records, to_records};
