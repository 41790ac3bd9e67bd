//! Gradient-descent planner over spline policies.

use std::sync::{Arc, RwLock};
use std::time::Instant;

use log::debug;

use crate::core::math::{log_scale, power_sequence, spline_time_shift};
use crate::derivatives::{
    CostDerivatives, CostGradients, DescentDirection, GradientSolver, ModelDerivatives,
    ModelJacobians,
};
use crate::error::{PlannerError, Result};
use crate::sim::{DynamicsModel, StateSnapshot, Task};
use crate::spline::SplinePolicy;
use crate::trajectory::MAX_HORIZON;

use super::config::GradientPlannerConfig;
use super::pool::{CandidatePool, CandidateSlot};
use super::scheduler::{RolloutContext, RolloutScheduler};
use super::telemetry::{PlannerDiagnostics, StageTimings};

/// Shared read handle onto the planner's published policy.
///
/// The control loop queries actions through this handle while the
/// planner optimizes; the planner takes the write side only for the
/// brief winner publication at the end of a call.
#[derive(Clone)]
pub struct PolicyHandle {
    nominal: Arc<RwLock<SplinePolicy>>,
}

impl PolicyHandle {
    /// Evaluate the published policy at `time`.
    pub fn action(&self, time: f64, action: &mut [f64]) {
        self.nominal.read().unwrap().evaluate(time, action);
    }

    /// Clone the published policy.
    pub fn snapshot(&self) -> SplinePolicy {
        self.nominal.read().unwrap().clone()
    }
}

/// Planner: improves a spline policy by first-order descent with a
/// parallel log-scale line search.
///
/// Single writer: exactly one thread calls [`optimize`] and [`set_state`];
/// concurrent readers go through [`PolicyHandle`]. A call that fails
/// mid-way publishes nothing and leaves the previous policy in force.
///
/// [`optimize`]: GradientPlanner::optimize
/// [`set_state`]: GradientPlanner::set_state
pub struct GradientPlanner {
    model: Arc<dyn DynamicsModel>,
    task: Arc<Task>,
    config: GradientPlannerConfig,

    nominal: Arc<RwLock<SplinePolicy>>,
    pool: CandidatePool,
    scheduler: RolloutScheduler,

    model_derivatives: Box<dyn ModelDerivatives>,
    cost_derivatives: Box<dyn CostDerivatives>,
    solver: Box<dyn GradientSolver>,
    jacobians: ModelJacobians,
    gradients: CostGradients,
    direction: DescentDirection,
    step_sizes: Vec<f64>,
    knot_times: Vec<f64>,

    state: Vec<f64>,
    aux: Vec<f64>,
    time: f64,

    timings: StageTimings,
    diagnostics: PlannerDiagnostics,
}

impl GradientPlanner {
    /// Build a planner for a model/task pair.
    pub fn new(
        model: Arc<dyn DynamicsModel>,
        task: Arc<Task>,
        config: GradientPlannerConfig,
        model_derivatives: Box<dyn ModelDerivatives>,
        cost_derivatives: Box<dyn CostDerivatives>,
        solver: Box<dyn GradientSolver>,
    ) -> Result<Self> {
        config.validate()?;
        let dims = model.dims();
        let nominal = SplinePolicy::new(
            config.spline_kind,
            dims.action,
            config.num_knots,
        )?;
        let pool = CandidatePool::new(
            &dims,
            task.num_residual(),
            config.spline_kind,
            config.num_knots,
            config.num_trajectory,
        )?;
        let scheduler = RolloutScheduler::new(&dims, config.num_threads);

        Ok(Self {
            nominal: Arc::new(RwLock::new(nominal)),
            pool,
            scheduler,
            model_derivatives,
            cost_derivatives,
            solver,
            jacobians: ModelJacobians::new(&dims),
            gradients: CostGradients::new(&dims),
            direction: DescentDirection::new(&dims),
            step_sizes: vec![0.0; config.num_trajectory],
            knot_times: vec![0.0; config.num_knots],
            state: vec![0.0; dims.state],
            aux: vec![0.0; dims.aux],
            time: 0.0,
            timings: StageTimings::default(),
            diagnostics: PlannerDiagnostics::default(),
            model,
            task,
            config,
        })
    }

    /// Handle for querying the published policy from other threads.
    pub fn policy_handle(&self) -> PolicyHandle {
        PolicyHandle {
            nominal: Arc::clone(&self.nominal),
        }
    }

    /// Load the initial condition for the next planning call.
    pub fn set_state(&mut self, snapshot: &StateSnapshot) {
        snapshot.copy_to(&mut self.state, &mut self.aux, &mut self.time);
    }

    /// Stage timings of the last planning call.
    pub fn timings(&self) -> &StageTimings {
        &self.timings
    }

    /// Line-search diagnostics of the last planning call.
    pub fn diagnostics(&self) -> &PlannerDiagnostics {
        &self.diagnostics
    }

    /// Best trajectory of the last planning call (slot 0 after winner
    /// adoption). Cloned out so the caller never holds a slot lock.
    pub fn best_trajectory(&self) -> crate::trajectory::Trajectory {
        self.pool.slot(0).lock().unwrap().trajectory.clone()
    }

    /// Episode reset: zero the published policy, candidate slots,
    /// scratch buffers, diagnostics, timers and the loaded state.
    pub fn reset(&mut self) {
        self.nominal.write().unwrap().reset();
        self.pool.reset();
        self.scheduler.scratch().reset_all();
        self.direction.reset();
        self.jacobians.reset();
        self.gradients.reset();
        self.state.fill(0.0);
        self.aux.fill(0.0);
        self.time = 0.0;
        self.timings.reset();
        self.diagnostics = PlannerDiagnostics::default();
    }

    /// Run one planning call over `horizon` steps from the loaded state.
    ///
    /// On success the winning policy is published; on error nothing is
    /// published and the timings of completed stages are kept.
    pub fn optimize(&mut self, horizon: usize) -> Result<()> {
        if horizon < 2 || horizon > MAX_HORIZON {
            return Err(PlannerError::HorizonOutOfRange {
                requested: horizon,
                max: MAX_HORIZON,
            });
        }
        let active = self.config.num_trajectory.min(self.pool.capacity());
        let nu = self.model.dims().action;
        self.timings.reset();

        // working copy of the published policy, resampled onto the
        // planning window
        self.resample_working_policy(horizon);

        // nominal rollout
        let start = Instant::now();
        let c_prev = self.rollout_nominal(horizon)?;
        self.timings.nominal_us = start.elapsed().as_micros() as u64;

        let mut best_cost = c_prev;
        let mut winner = active - 1;
        let mut expected = 0.0;
        let mut winner_step = 0.0;

        for _ in 0..self.config.max_rollout {
            // derivatives along the current working trajectory
            let slot0 = self.pool.slot(0);
            {
                let slot = slot0.lock().unwrap();
                let start = Instant::now();
                let model_result = self.model_derivatives.compute(
                    self.model.as_ref(),
                    &slot.trajectory,
                    &mut self.jacobians,
                );
                self.timings.model_derivs_us += start.elapsed().as_micros() as u64;
                model_result?;

                let start = Instant::now();
                let cost_result = self.cost_derivatives.compute(
                    self.model.as_ref(),
                    &self.task,
                    &slot.trajectory,
                    &mut self.gradients,
                );
                self.timings.cost_derivs_us += start.elapsed().as_micros() as u64;
                cost_result?;
            }

            let start = Instant::now();
            let solved = self.solver.solve(
                &self.jacobians,
                &self.gradients,
                horizon,
                &mut self.direction,
            );
            self.timings.solve_us += start.elapsed().as_micros() as u64;
            solved?;

            // pull the per-step direction back to knot space
            {
                let mut slot = slot0.lock().unwrap();
                let CandidateSlot {
                    policy, trajectory, ..
                } = &mut *slot;
                policy.backward_map(
                    &self.direction.k[..(horizon - 1) * nu],
                    &trajectory.times[..horizon - 1],
                );
            }

            // step sizes descend geometrically; the last slot rolls out
            // the unstepped policy so the search can never regress
            log_scale(
                &mut self.step_sizes[..active - 1],
                1.0,
                self.config.min_step_size,
            );
            self.step_sizes[active - 1] = 0.0;
            self.pool.stage_candidates(active, &self.step_sizes);

            let context = Arc::new(RolloutContext {
                model: Arc::clone(&self.model),
                task: Arc::clone(&self.task),
                state: self.state.clone(),
                aux: self.aux.clone(),
                time: self.time,
                horizon,
            });
            let start = Instant::now();
            self.scheduler.rollout_all(&self.pool, active, context);
            self.timings.rollouts_us += start.elapsed().as_micros() as u64;

            let (batch_winner, batch_best) = self.pool.select_winner(active, best_cost);
            best_cost = batch_best;
            winner = batch_winner;
            winner_step = self.pool.slot(winner).lock().unwrap().step_size;
            expected = -winner_step * self.direction.dv[0] - 1.0e-16;

            // adopt the winner as the working policy for the next
            // iteration (slot 0 already holds it when winner == 0)
            if winner != 0 {
                let winner_slot = self.pool.slot(winner);
                let winner_guard = winner_slot.lock().unwrap();
                let mut slot = slot0.lock().unwrap();
                slot.policy.copy_parameters_from(
                    winner_guard.policy.parameters(),
                    winner_guard.policy.times(),
                );
                slot.trajectory.copy_from(&winner_guard.trajectory);
            }
        }

        let improvement = c_prev - best_cost;
        self.diagnostics = PlannerDiagnostics {
            winner,
            step_size: winner_step,
            improvement,
            expected,
            surprise: (improvement / expected).max(0.0).min(2.0),
        };

        // publish under the write lock
        let start = Instant::now();
        {
            let slot0 = self.pool.slot(0);
            let slot = slot0.lock().unwrap();
            let mut nominal = self.nominal.write().unwrap();
            nominal.copy_parameters_from(slot.policy.parameters(), slot.policy.times());
        }
        self.timings.policy_update_us = start.elapsed().as_micros() as u64;

        debug!(
            "plan: horizon={horizon} winner={winner} step={winner_step:.6} \
             improvement={improvement:.6e} total_us={}",
            self.timings.total_us()
        );
        Ok(())
    }

    /// Copy the published policy into slot 0 and resample it onto
    /// uniform knot times covering the planning window, then warp the
    /// times by the configured power law.
    fn resample_working_policy(&mut self, horizon: usize) {
        let shift = spline_time_shift(horizon, self.model.timestep(), self.config.num_knots);
        for (k, t) in self.knot_times.iter_mut().enumerate() {
            *t = self.time + k as f64 * shift;
        }

        let slot0 = self.pool.slot(0);
        let mut slot = slot0.lock().unwrap();
        slot.policy.copy_from(&self.nominal.read().unwrap());
        slot.policy.resample(&self.knot_times);

        let t1 = self.knot_times[0];
        let t2 = self.knot_times[self.knot_times.len() - 1];
        power_sequence(&mut self.knot_times, shift, t1, t2, self.config.power);
        slot.policy.set_times(&self.knot_times);
    }

    /// Roll out slot 0's policy from the loaded state on the caller's
    /// thread. Returns the nominal cost.
    fn rollout_nominal(&mut self, horizon: usize) -> Result<f64> {
        let mut scratch = self.scheduler.scratch().acquire();
        let slot0 = self.pool.slot(0);
        let mut slot = slot0.lock().unwrap();
        let CandidateSlot {
            policy, trajectory, ..
        } = &mut *slot;
        let total = trajectory.rollout(
            |action, _state, time| policy.evaluate(time, action),
            &self.task,
            self.model.as_ref(),
            scratch.data(),
            &self.state,
            self.time,
            &self.aux,
            horizon,
        )?;
        slot.cost = total;
        Ok(total)
    }
}
