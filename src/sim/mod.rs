//! Simulation-side contracts consumed by the planning core.
//!
//! The physics engine, task residual authoring, and state sources are
//! external collaborators; this module defines the traits and buffers
//! the planner needs from them.

pub mod model;
pub mod state;
pub mod task;

pub use model::{DynamicsModel, SimData};
pub use state::StateSnapshot;
pub use task::{NormKind, NormSpec, ResidualFn, Task};
