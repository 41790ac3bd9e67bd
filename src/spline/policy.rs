//! Spline policy: forward evaluation, resampling, gradient back-mapping.

use crate::error::{PlannerError, Result};
use crate::spline::kernel::{knot_weights, SplineKind};

/// Time-parametrized control policy over a knot sequence.
///
/// Parameters are stored knot-major: knot `k` owns
/// `parameters[k*dim_action .. (k+1)*dim_action]`. Knot times are
/// non-decreasing. All policies sharing a planning call have the same
/// knot count and control dimension.
#[derive(Debug, Clone)]
pub struct SplinePolicy {
    kind: SplineKind,
    dim_action: usize,
    times: Vec<f64>,
    parameters: Vec<f64>,
    /// Cached per-knot descent direction, filled by [`backward_map`]
    /// and consumed by [`apply_step`].
    ///
    /// [`backward_map`]: SplinePolicy::backward_map
    /// [`apply_step`]: SplinePolicy::apply_step
    update_direction: Vec<f64>,
    scratch_parameters: Vec<f64>,
}

impl SplinePolicy {
    /// Create a zeroed policy.
    ///
    /// Fails fast when `num_knots` is below the kernel minimum
    /// (step >= 1, linear >= 2, cubic >= 4).
    pub fn new(kind: SplineKind, dim_action: usize, num_knots: usize) -> Result<Self> {
        if num_knots < kind.min_knots() {
            return Err(PlannerError::TooFewKnots {
                kind,
                required: kind.min_knots(),
                actual: num_knots,
            });
        }
        if dim_action == 0 {
            return Err(PlannerError::Config("dim_action must be positive".into()));
        }
        Ok(Self {
            kind,
            dim_action,
            times: vec![0.0; num_knots],
            parameters: vec![0.0; num_knots * dim_action],
            update_direction: vec![0.0; num_knots * dim_action],
            scratch_parameters: vec![0.0; num_knots * dim_action],
        })
    }

    /// Interpolation kernel kind.
    pub fn kind(&self) -> SplineKind {
        self.kind
    }

    /// Control dimension.
    pub fn dim_action(&self) -> usize {
        self.dim_action
    }

    /// Number of knots.
    pub fn num_knots(&self) -> usize {
        self.times.len()
    }

    /// Knot times.
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Knot parameters, knot-major.
    pub fn parameters(&self) -> &[f64] {
        &self.parameters
    }

    /// Cached descent direction, knot-major.
    pub fn update_direction(&self) -> &[f64] {
        &self.update_direction
    }

    /// Evaluate the control at `time`. Clamps to the boundary knot
    /// values outside the knot span.
    pub fn evaluate(&self, time: f64, action: &mut [f64]) {
        debug_assert_eq!(action.len(), self.dim_action);
        let kw = knot_weights(self.kind, &self.times, time);
        action.fill(0.0);
        for j in 0..kw.count {
            let knot = &self.parameters
                [(kw.start + j) * self.dim_action..(kw.start + j + 1) * self.dim_action];
            let w = kw.w[j];
            for (a, p) in action.iter_mut().zip(knot) {
                *a += w * p;
            }
        }
    }

    /// Re-evaluate the policy at `new_times` and replace its own knots
    /// with the result (shifts the policy window for a new horizon).
    ///
    /// `new_times` must have exactly `num_knots` entries, non-decreasing.
    pub fn resample(&mut self, new_times: &[f64]) {
        debug_assert_eq!(new_times.len(), self.num_knots());
        for (k, &t) in new_times.iter().enumerate() {
            let kw = knot_weights(self.kind, &self.times, t);
            let row = &mut self.scratch_parameters[k * self.dim_action..(k + 1) * self.dim_action];
            row.fill(0.0);
            for j in 0..kw.count {
                let knot = &self.parameters
                    [(kw.start + j) * self.dim_action..(kw.start + j + 1) * self.dim_action];
                let w = kw.w[j];
                for (r, p) in row.iter_mut().zip(knot) {
                    *r += w * p;
                }
            }
        }
        std::mem::swap(&mut self.parameters, &mut self.scratch_parameters);
        self.times.copy_from_slice(new_times);
    }

    /// Overwrite the knot times (used for power-law time warping after
    /// a resample). Parameters are left untouched.
    pub fn set_times(&mut self, times: &[f64]) {
        debug_assert_eq!(times.len(), self.num_knots());
        self.times.copy_from_slice(times);
    }

    /// Pull a per-timestep gradient direction back to knot space.
    ///
    /// Applies the transpose of the kernel's time-sampling weights: the
    /// adjoint of [`evaluate`] sampled at `step_times`. `directions` is
    /// step-major with `dim_action` entries per step. The result lands
    /// in the cached update-direction buffer.
    ///
    /// [`evaluate`]: SplinePolicy::evaluate
    pub fn backward_map(&mut self, directions: &[f64], step_times: &[f64]) {
        debug_assert_eq!(directions.len(), step_times.len() * self.dim_action);
        self.update_direction.fill(0.0);
        for (t_idx, &t) in step_times.iter().enumerate() {
            let kw = knot_weights(self.kind, &self.times, t);
            let step = &directions[t_idx * self.dim_action..(t_idx + 1) * self.dim_action];
            for j in 0..kw.count {
                let knot = &mut self.update_direction
                    [(kw.start + j) * self.dim_action..(kw.start + j + 1) * self.dim_action];
                let w = kw.w[j];
                for (u, d) in knot.iter_mut().zip(step) {
                    *u += w * d;
                }
            }
        }
    }

    /// `parameters += step * update_direction`.
    pub fn apply_step(&mut self, step: f64) {
        for (p, u) in self.parameters.iter_mut().zip(&self.update_direction) {
            *p += step * u;
        }
    }

    /// Copy another policy wholesale (times, parameters, direction).
    /// Both policies must share knot count and control dimension.
    pub fn copy_from(&mut self, other: &SplinePolicy) {
        debug_assert_eq!(self.num_knots(), other.num_knots());
        debug_assert_eq!(self.dim_action, other.dim_action);
        self.kind = other.kind;
        self.times.copy_from_slice(&other.times);
        self.parameters.copy_from_slice(&other.parameters);
        self.update_direction.copy_from_slice(&other.update_direction);
    }

    /// Replace parameters and times, leaving the cached direction alone.
    pub fn copy_parameters_from(&mut self, parameters: &[f64], times: &[f64]) {
        debug_assert_eq!(parameters.len(), self.parameters.len());
        debug_assert_eq!(times.len(), self.times.len());
        self.parameters.copy_from_slice(parameters);
        self.times.copy_from_slice(times);
    }

    /// Zero times, parameters and the cached direction.
    pub fn reset(&mut self) {
        self.times.fill(0.0);
        self.parameters.fill(0.0);
        self.update_direction.fill(0.0);
    }
}
