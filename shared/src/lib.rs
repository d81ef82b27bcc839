//! Shared types and models for the consignment ledger
//!
//! Pure domain data and functions: the location graph, the catalog, ledger
//! rows and their per-action rules, and the projections folded from them.
//! Nothing in this crate performs I/O.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
