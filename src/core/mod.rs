//! Core foundation: dimension types and math primitives.

pub mod math;
pub mod types;

pub use types::ModelDims;
