//! Fixed-capacity rollout buffer.

use crate::core::ModelDims;
use crate::error::{PlannerError, Result};
use crate::sim::{DynamicsModel, SimData, Task};

/// Compile-time cap on rollout horizon length.
pub const MAX_HORIZON: usize = 512;

/// States, actions, residuals and costs produced by simulating a policy
/// over a horizon.
///
/// Buffers are allocated once at [`MAX_HORIZON`] capacity and reused;
/// `total_return` is only meaningful after a completed rollout. The
/// trajectory records `horizon` states but only `horizon - 1` applied
/// actions; the final step stores a zero action and its residual.
#[derive(Debug, Clone)]
pub struct Trajectory {
    dim_state: usize,
    dim_action: usize,
    num_residual: usize,
    /// Active horizon length (states recorded).
    pub horizon: usize,
    /// Step-major states, `dim_state` per step.
    pub states: Vec<f64>,
    /// Step-major actions, `dim_action` per step.
    pub actions: Vec<f64>,
    /// Per-step simulation times.
    pub times: Vec<f64>,
    /// Step-major task residuals, `num_residual` per step.
    pub residuals: Vec<f64>,
    /// Per-step risk-transformed costs.
    pub costs: Vec<f64>,
    /// Per-step 3-D diagnostic trace.
    pub traces: Vec<f64>,
    /// Sum of per-step costs over the horizon.
    pub total_return: f64,
}

impl Trajectory {
    /// Allocate a trajectory sized for a model and task.
    pub fn new(dims: &ModelDims, num_residual: usize) -> Self {
        Self {
            dim_state: dims.state,
            dim_action: dims.action,
            num_residual,
            horizon: 0,
            states: vec![0.0; MAX_HORIZON * dims.state],
            actions: vec![0.0; MAX_HORIZON * dims.action],
            times: vec![0.0; MAX_HORIZON],
            residuals: vec![0.0; MAX_HORIZON * num_residual],
            costs: vec![0.0; MAX_HORIZON],
            traces: vec![0.0; MAX_HORIZON * 3],
            total_return: 0.0,
        }
    }

    /// Control dimension per step.
    pub fn dim_action(&self) -> usize {
        self.dim_action
    }

    /// State dimension per step.
    pub fn dim_state(&self) -> usize {
        self.dim_state
    }

    /// Residual dimension per step.
    pub fn num_residual(&self) -> usize {
        self.num_residual
    }

    /// State recorded at `step`.
    pub fn state_at(&self, step: usize) -> &[f64] {
        &self.states[step * self.dim_state..(step + 1) * self.dim_state]
    }

    /// Action recorded at `step`.
    pub fn action_at(&self, step: usize) -> &[f64] {
        &self.actions[step * self.dim_action..(step + 1) * self.dim_action]
    }

    /// Residual recorded at `step`.
    pub fn residual_at(&self, step: usize) -> &[f64] {
        &self.residuals[step * self.num_residual..(step + 1) * self.num_residual]
    }

    /// Zero all buffers and set the active horizon.
    pub fn reset(&mut self, horizon: usize) -> Result<()> {
        if horizon > MAX_HORIZON {
            return Err(PlannerError::HorizonOutOfRange {
                requested: horizon,
                max: MAX_HORIZON,
            });
        }
        self.horizon = horizon;
        self.states.fill(0.0);
        self.actions.fill(0.0);
        self.times.fill(0.0);
        self.residuals.fill(0.0);
        self.costs.fill(0.0);
        self.traces.fill(0.0);
        self.total_return = 0.0;
        Ok(())
    }

    /// Simulate `policy` over `horizon` steps from the given initial
    /// condition, filling all buffers. Returns the total return.
    ///
    /// `policy` receives `(action_out, state, time)`. Output is
    /// deterministic for a fixed policy/model/initial-state tuple.
    #[allow(clippy::too_many_arguments)]
    pub fn rollout<P>(
        &mut self,
        mut policy: P,
        task: &Task,
        model: &dyn DynamicsModel,
        data: &mut SimData,
        state: &[f64],
        time: f64,
        aux: &[f64],
        horizon: usize,
    ) -> Result<f64>
    where
        P: FnMut(&mut [f64], &[f64], f64),
    {
        if horizon < 2 || horizon > MAX_HORIZON {
            return Err(PlannerError::HorizonOutOfRange {
                requested: horizon,
                max: MAX_HORIZON,
            });
        }
        debug_assert_eq!(state.len(), self.dim_state);

        self.horizon = horizon;
        data.load(state, aux, time);

        let nx = self.dim_state;
        let nu = self.dim_action;
        let nr = self.num_residual;
        let mut total = 0.0;

        for t in 0..horizon {
            self.states[t * nx..(t + 1) * nx].copy_from_slice(&data.state);
            self.times[t] = data.time;
            let trace = model.position_trace(data);
            self.traces[3 * t..3 * t + 3].copy_from_slice(&trace);

            if t + 1 < horizon {
                policy(&mut self.actions[t * nu..(t + 1) * nu], &data.state, data.time);
            } else {
                // terminal step: zero action
                self.actions[t * nu..(t + 1) * nu].fill(0.0);
            }
            task.residual(
                data,
                &self.actions[t * nu..(t + 1) * nu],
                &mut self.residuals[t * nr..(t + 1) * nr],
            );
            self.costs[t] = task.cost_value(&self.residuals[t * nr..(t + 1) * nr]);
            total += self.costs[t];

            if t + 1 < horizon {
                model.step(data, &self.actions[t * nu..(t + 1) * nu]);
            }
        }

        self.total_return = total;
        Ok(total)
    }

    /// Copy another trajectory's contents. Both must share dimensions.
    pub fn copy_from(&mut self, other: &Trajectory) {
        debug_assert_eq!(self.dim_state, other.dim_state);
        debug_assert_eq!(self.dim_action, other.dim_action);
        debug_assert_eq!(self.num_residual, other.num_residual);
        self.horizon = other.horizon;
        self.states.copy_from_slice(&other.states);
        self.actions.copy_from_slice(&other.actions);
        self.times.copy_from_slice(&other.times);
        self.residuals.copy_from_slice(&other.residuals);
        self.costs.copy_from_slice(&other.costs);
        self.traces.copy_from_slice(&other.traces);
        self.total_return = other.total_return;
    }
}
