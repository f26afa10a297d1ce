//! Infrastructure adapters and runtime bootstrap.

pub mod error;
pub mod fetch;
pub mod pdf;
pub mod telemetry;
