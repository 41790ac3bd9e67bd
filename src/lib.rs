//! YantraMPC - Gradient-descent model-predictive planning core
//!
//! # Architecture
//!
//! The crate is organized into 5 logical layers:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    planner/                         │  ← Orchestration
//! │   (gradient loop, candidate pool, rollout workers)  │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                  derivatives/                       │  ← Gradient machinery
//! │     (model Jacobians, cost gradients, solver)       │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │               spline/ + trajectory                  │  ← Policy and rollout
//! │      (interpolation kernels, rollout buffers)       │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                      sim/                           │  ← Model contracts
//! │        (dynamics, task cost, state snapshot)        │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                     core/                           │  ← Foundation
//! │                  (types, math)                      │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Planning loop
//!
//! Each call to [`GradientPlanner::optimize`] runs one bounded
//! improvement pass:
//!
//! 1. Snapshot the published policy and resample its knots onto the
//!    planning window.
//! 2. Roll out the nominal policy to get the reference cost.
//! 3. Linearize the dynamics and cost along the nominal trajectory and
//!    run the backward pass for a descent direction.
//! 4. Pull the direction back to knot space, stage candidates at
//!    log-spaced step sizes (plus one zero-step candidate), and roll
//!    them out in parallel.
//! 5. Adopt the cheapest candidate and publish it under the policy
//!    write lock. The zero-step candidate guarantees the published
//!    policy never regresses.
//!
//! Control threads query actions through [`PolicyHandle`] without ever
//! blocking on the optimization.

pub mod core;
pub mod derivatives;
pub mod error;
pub mod planner;
pub mod sim;
pub mod spline;
pub mod trajectory;

pub use crate::core::ModelDims;
pub use crate::error::{PlannerError, Result};
pub use crate::planner::{
    GradientPlanner, GradientPlannerConfig, PlannerDiagnostics, PolicyHandle, StageTimings,
};
pub use crate::sim::{DynamicsModel, NormKind, NormSpec, ResidualFn, SimData, StateSnapshot, Task};
pub use crate::spline::{SplineKind, SplinePolicy};
pub use crate::trajectory::{Trajectory, MAX_HORIZON};
