//! Error types for the planning core.

use thiserror::Error;

use crate::spline::SplineKind;

/// Planner error type.
#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{kind:?} interpolation needs at least {required} knots, got {actual}")]
    TooFewKnots {
        kind: SplineKind,
        required: usize,
        actual: usize,
    },

    #[error("Horizon {requested} outside supported range 2..={max}")]
    HorizonOutOfRange { requested: usize, max: usize },

    #[error("Derivative computation failed: {0}")]
    Derivatives(String),

    #[error("Gradient solve failed: {0}")]
    GradientSolve(String),
}

pub type Result<T> = std::result::Result<T, PlannerError>;
