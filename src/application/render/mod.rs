//! Formula rendering strategies.
//!
//! A renderer turns a [`FormulaBatch`](crate::domain::formula::FormulaBatch)
//! into one embed per formula by driving an external TeX tool. Failures are
//! reported as [`RenderError`] and never abort a conversion.

mod service;
mod types;

pub use service::{RenderStrategy, RenderToolchain};
pub use types::{FormulaRenderer, RenderArtifacts, RenderError, RenderedEmbeds};
