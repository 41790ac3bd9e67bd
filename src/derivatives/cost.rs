//! Cost gradient buffers and producer contract.

use crate::core::ModelDims;
use crate::error::Result;
use crate::sim::{DynamicsModel, Task};
use crate::trajectory::{Trajectory, MAX_HORIZON};

/// Per-timestep cost gradients along a trajectory.
///
/// `cx` holds `d(cost)/dx` (state-derivative space) and `cu` holds
/// `d(cost)/du` for each step.
#[derive(Debug, Clone)]
pub struct CostGradients {
    dim_state_derivative: usize,
    dim_action: usize,
    /// Step-major state gradients.
    pub cx: Vec<f64>,
    /// Step-major action gradients.
    pub cu: Vec<f64>,
}

impl CostGradients {
    /// Allocate at full horizon capacity.
    pub fn new(dims: &ModelDims) -> Self {
        Self {
            dim_state_derivative: dims.state_derivative,
            dim_action: dims.action,
            cx: vec![0.0; MAX_HORIZON * dims.state_derivative],
            cu: vec![0.0; MAX_HORIZON * dims.action],
        }
    }

    /// State gradient for `step`.
    pub fn cx_at(&self, step: usize) -> &[f64] {
        let ndx = self.dim_state_derivative;
        &self.cx[step * ndx..(step + 1) * ndx]
    }

    /// Mutable state gradient for `step`.
    pub fn cx_at_mut(&mut self, step: usize) -> &mut [f64] {
        let ndx = self.dim_state_derivative;
        &mut self.cx[step * ndx..(step + 1) * ndx]
    }

    /// Action gradient for `step`.
    pub fn cu_at(&self, step: usize) -> &[f64] {
        let nu = self.dim_action;
        &self.cu[step * nu..(step + 1) * nu]
    }

    /// Mutable action gradient for `step`.
    pub fn cu_at_mut(&mut self, step: usize) -> &mut [f64] {
        let nu = self.dim_action;
        &mut self.cu[step * nu..(step + 1) * nu]
    }

    /// Zero all gradients.
    pub fn reset(&mut self) {
        self.cx.fill(0.0);
        self.cu.fill(0.0);
    }
}

/// Producer of per-step cost gradients along a trajectory.
///
/// Must fill steps `0..trajectory.horizon` for `cx` and
/// `0..trajectory.horizon - 1` for `cu`.
pub trait CostDerivatives: Send + Sync {
    fn compute(
        &mut self,
        model: &dyn DynamicsModel,
        task: &Task,
        trajectory: &Trajectory,
        out: &mut CostGradients,
    ) -> Result<()>;
}
