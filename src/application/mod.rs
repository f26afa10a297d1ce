//! Conversion pipeline and the seams it is driven through.

pub mod convert;
pub mod error;
pub mod formulas;
pub(crate) mod markup;
pub mod ports;
pub mod render;
pub mod statement;
