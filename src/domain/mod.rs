//! Domain layer types and invariants.

pub mod error;
pub mod formula;
pub mod problem;
pub mod types;
