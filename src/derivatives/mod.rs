//! Derivative-kernel and gradient-solver contracts.
//!
//! The numerical kernels that produce model Jacobians and cost
//! gradients are external collaborators; this module defines the
//! buffers they fill and the traits the planner consumes, plus a
//! reference backward-pass solver.

mod cost;
mod gradient;
mod model;

pub use cost::{CostDerivatives, CostGradients};
pub use gradient::{AdjointSolver, DescentDirection, GradientSolver};
pub use model::{ModelDerivatives, ModelJacobians};
