//! Gradient planner configuration.

use serde::{Deserialize, Serialize};

use crate::error::{PlannerError, Result};
use crate::spline::SplineKind;

use super::pool::MAX_CANDIDATES;

/// Configuration for [`GradientPlanner`].
///
/// [`GradientPlanner`]: super::GradientPlanner
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GradientPlannerConfig {
    /// Line-search candidates per batch, including the zero-step one.
    pub num_trajectory: usize,
    /// Improvement iterations per planning call.
    pub max_rollout: usize,
    /// Smallest non-zero line-search step size.
    pub min_step_size: f64,
    /// Policy interpolation kernel.
    pub spline_kind: SplineKind,
    /// Policy knot count.
    pub num_knots: usize,
    /// Knot-time warp exponent; `1.0` keeps knots uniform.
    pub power: f64,
    /// Rollout worker threads.
    pub num_threads: usize,
}

impl Default for GradientPlannerConfig {
    fn default() -> Self {
        Self {
            num_trajectory: 32,
            max_rollout: 1,
            min_step_size: 1.0e-4,
            spline_kind: SplineKind::Linear,
            num_knots: 10,
            power: 1.0,
            num_threads: 4,
        }
    }
}

impl GradientPlannerConfig {
    /// Check the configuration for internal consistency.
    pub fn validate(&self) -> Result<()> {
        if self.num_trajectory == 0 {
            return Err(PlannerError::Config(
                "num_trajectory must be positive".into(),
            ));
        }
        if self.num_trajectory > MAX_CANDIDATES {
            return Err(PlannerError::Config(format!(
                "num_trajectory {} exceeds the candidate cap {MAX_CANDIDATES}",
                self.num_trajectory
            )));
        }
        if self.max_rollout == 0 {
            return Err(PlannerError::Config("max_rollout must be positive".into()));
        }
        if !(self.min_step_size > 0.0 && self.min_step_size <= 1.0) {
            return Err(PlannerError::Config(format!(
                "min_step_size must be in (0, 1], got {}",
                self.min_step_size
            )));
        }
        if self.num_knots < self.spline_kind.min_knots() {
            return Err(PlannerError::TooFewKnots {
                kind: self.spline_kind,
                required: self.spline_kind.min_knots(),
                actual: self.num_knots,
            });
        }
        if self.num_knots < 2 {
            return Err(PlannerError::Config(
                "num_knots must be at least 2 to span a horizon".into(),
            ));
        }
        if !(self.power.is_finite() && self.power > 0.0) {
            return Err(PlannerError::Config(format!(
                "power must be positive, got {}",
                self.power
            )));
        }
        if self.num_threads == 0 {
            return Err(PlannerError::Config("num_threads must be positive".into()));
        }
        Ok(())
    }
}
