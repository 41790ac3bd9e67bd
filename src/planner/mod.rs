//! Gradient planner: configuration, candidate pool, rollout scheduling,
//! telemetry and the optimization loop itself.

mod config;
mod gradient_planner;
mod pool;
mod scheduler;
mod scratch;
mod telemetry;
mod workers;

pub use config::GradientPlannerConfig;
pub use gradient_planner::{GradientPlanner, PolicyHandle};
pub use pool::{CandidatePool, CandidateSlot, MAX_CANDIDATES};
pub use scheduler::{RolloutContext, RolloutScheduler};
pub use scratch::{ScratchGuard, ScratchPool};
pub use telemetry::{PlannerDiagnostics, StageTimings};
pub use workers::WorkerPool;
