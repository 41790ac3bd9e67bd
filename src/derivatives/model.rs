//! Model Jacobian buffers and producer contract.

use crate::core::ModelDims;
use crate::error::Result;
use crate::sim::DynamicsModel;
use crate::trajectory::{Trajectory, MAX_HORIZON};

/// Per-timestep dynamics Jacobians along a trajectory.
///
/// For each transition step `t`, `a` holds the row-major
/// `state_derivative x state_derivative` matrix `df/dx` and `b` the
/// `state_derivative x action` matrix `df/du`.
#[derive(Debug, Clone)]
pub struct ModelJacobians {
    dim_state_derivative: usize,
    dim_action: usize,
    /// Step-major `df/dx` blocks.
    pub a: Vec<f64>,
    /// Step-major `df/du` blocks.
    pub b: Vec<f64>,
}

impl ModelJacobians {
    /// Allocate at full horizon capacity.
    pub fn new(dims: &ModelDims) -> Self {
        let ndx = dims.state_derivative;
        Self {
            dim_state_derivative: ndx,
            dim_action: dims.action,
            a: vec![0.0; MAX_HORIZON * ndx * ndx],
            b: vec![0.0; MAX_HORIZON * ndx * dims.action],
        }
    }

    /// State-derivative dimension.
    pub fn dim_state_derivative(&self) -> usize {
        self.dim_state_derivative
    }

    /// Action dimension.
    pub fn dim_action(&self) -> usize {
        self.dim_action
    }

    /// `df/dx` block for transition `step`.
    pub fn a_at(&self, step: usize) -> &[f64] {
        let size = self.dim_state_derivative * self.dim_state_derivative;
        &self.a[step * size..(step + 1) * size]
    }

    /// Mutable `df/dx` block for transition `step`.
    pub fn a_at_mut(&mut self, step: usize) -> &mut [f64] {
        let size = self.dim_state_derivative * self.dim_state_derivative;
        &mut self.a[step * size..(step + 1) * size]
    }

    /// `df/du` block for transition `step`.
    pub fn b_at(&self, step: usize) -> &[f64] {
        let size = self.dim_state_derivative * self.dim_action;
        &self.b[step * size..(step + 1) * size]
    }

    /// Mutable `df/du` block for transition `step`.
    pub fn b_at_mut(&mut self, step: usize) -> &mut [f64] {
        let size = self.dim_state_derivative * self.dim_action;
        &mut self.b[step * size..(step + 1) * size]
    }

    /// Zero all blocks.
    pub fn reset(&mut self) {
        self.a.fill(0.0);
        self.b.fill(0.0);
    }
}

/// Producer of dynamics Jacobians along a trajectory.
///
/// Typically a finite-difference kernel over the simulation model.
/// Must fill blocks `0..trajectory.horizon - 1`.
pub trait ModelDerivatives: Send + Sync {
    fn compute(
        &mut self,
        model: &dyn DynamicsModel,
        trajectory: &Trajectory,
        out: &mut ModelJacobians,
    ) -> Result<()>;
}
