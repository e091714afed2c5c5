//! Metrics definitions for tollgate.
//!
//! This crate only names metrics and re-exports the `metrics` facade macros.
//! Nothing is recorded until the embedding application installs a recorder,
//! so library crates can emit unconditionally behind their `metrics` feature.
//!
//! ```rust,ignore
//! use tollgate_metrics::{counter, fetch, labels};
//!
//! counter!(fetch::REQUESTS_TOTAL, labels::ENDPOINT => "wikipedia_summary").increment(1);
//! ```

mod definitions;

pub use definitions::*;

// Re-export metrics macros for convenience
pub use metrics::{counter, gauge, histogram};
