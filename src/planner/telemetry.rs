//! Read-only telemetry published by the planner.

/// Wall-clock stage timings for the last planning call, microseconds.
///
/// Loop stages accumulate across improvement iterations within one
/// call. An aborted call keeps the timings of the stages that ran.
#[derive(Debug, Clone, Copy, Default)]
pub struct StageTimings {
    /// Nominal rollout.
    pub nominal_us: u64,
    /// Model Jacobian computation.
    pub model_derivs_us: u64,
    /// Cost gradient computation.
    pub cost_derivs_us: u64,
    /// Gradient solve.
    pub solve_us: u64,
    /// Parallel candidate rollouts.
    pub rollouts_us: u64,
    /// Winner publication under the policy lock.
    pub policy_update_us: u64,
}

impl StageTimings {
    /// Zero all stages.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Sum of all stages.
    pub fn total_us(&self) -> u64 {
        self.nominal_us
            + self.model_derivs_us
            + self.cost_derivs_us
            + self.solve_us
            + self.rollouts_us
            + self.policy_update_us
    }
}

/// Line-search diagnostics for the last planning call.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlannerDiagnostics {
    /// Index of the winning candidate.
    pub winner: usize,
    /// Step size of the winning candidate.
    pub step_size: f64,
    /// Actual cost improvement over the nominal rollout.
    pub improvement: f64,
    /// First-order expected improvement along the winning step.
    pub expected: f64,
    /// Improvement ratio `improvement / expected`, clamped to `[0, 2]`.
    pub surprise: f64,
}
