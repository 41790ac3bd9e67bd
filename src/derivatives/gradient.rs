//! Gradient solver contract and reference backward pass.

use crate::core::math::{dot, mul_mat_t_vec};
use crate::core::ModelDims;
use crate::error::{PlannerError, Result};
use crate::trajectory::MAX_HORIZON;

use super::cost::CostGradients;
use super::model::ModelJacobians;

/// Per-timestep descent direction in action space, plus the expected
/// value-improvement estimate.
#[derive(Debug, Clone)]
pub struct DescentDirection {
    dim_action: usize,
    /// Step-major direction, `dim_action` entries per transition step.
    pub k: Vec<f64>,
    /// Value-improvement coefficients. `dv[0]` is the directional
    /// derivative along `k` (negative when a descent direction exists);
    /// `dv[1]` accumulates the squared gradient magnitude.
    pub dv: [f64; 2],
}

impl DescentDirection {
    /// Allocate at full horizon capacity.
    pub fn new(dims: &ModelDims) -> Self {
        Self {
            dim_action: dims.action,
            k: vec![0.0; MAX_HORIZON * dims.action],
            dv: [0.0; 2],
        }
    }

    /// Direction for transition `step`.
    pub fn k_at(&self, step: usize) -> &[f64] {
        let nu = self.dim_action;
        &self.k[step * nu..(step + 1) * nu]
    }

    /// Zero the direction and coefficients.
    pub fn reset(&mut self) {
        self.k.fill(0.0);
        self.dv = [0.0; 2];
    }
}

/// Backward-pass computation of the descent direction.
///
/// A failed solve aborts the whole planning call; the planner publishes
/// nothing for that call (fail-soft).
pub trait GradientSolver: Send + Sync {
    fn solve(
        &mut self,
        jacobians: &ModelJacobians,
        gradients: &CostGradients,
        horizon: usize,
        out: &mut DescentDirection,
    ) -> Result<()>;
}

/// Reference adjoint backward pass.
///
/// Accumulates the value gradient backwards through the linearized
/// dynamics: `qu_t = cu_t + B_t' vx`, `k_t = -qu_t`,
/// `vx <- cx_t + A_t' vx`. Non-finite intermediates fail the solve.
#[derive(Debug)]
pub struct AdjointSolver {
    vx: Vec<f64>,
    qx: Vec<f64>,
    qu: Vec<f64>,
}

impl AdjointSolver {
    /// Allocate solver scratch for a model.
    pub fn new(dims: &ModelDims) -> Self {
        Self {
            vx: vec![0.0; dims.state_derivative],
            qx: vec![0.0; dims.state_derivative],
            qu: vec![0.0; dims.action],
        }
    }
}

impl GradientSolver for AdjointSolver {
    fn solve(
        &mut self,
        jacobians: &ModelJacobians,
        gradients: &CostGradients,
        horizon: usize,
        out: &mut DescentDirection,
    ) -> Result<()> {
        let ndx = jacobians.dim_state_derivative();
        let nu = jacobians.dim_action();
        debug_assert!(horizon >= 2);

        out.reset();
        // terminal value gradient
        self.vx.copy_from_slice(gradients.cx_at(horizon - 1));

        for t in (0..horizon - 1).rev() {
            // qu = cu + B' vx
            mul_mat_t_vec(&mut self.qu, jacobians.b_at(t), &self.vx, ndx, nu);
            for (q, c) in self.qu.iter_mut().zip(gradients.cu_at(t)) {
                *q += c;
            }
            if self.qu.iter().any(|q| !q.is_finite()) {
                return Err(PlannerError::GradientSolve(format!(
                    "non-finite action gradient at step {t}"
                )));
            }

            // k = -qu
            let k = &mut out.k[t * nu..(t + 1) * nu];
            for (ki, q) in k.iter_mut().zip(&self.qu) {
                *ki = -q;
            }
            out.dv[0] += dot(&self.qu, k);
            out.dv[1] += dot(&self.qu, &self.qu);

            // vx <- cx + A' vx
            mul_mat_t_vec(&mut self.qx, jacobians.a_at(t), &self.vx, ndx, ndx);
            for (q, c) in self.qx.iter_mut().zip(gradients.cx_at(t)) {
                *q += c;
            }
            if self.qx.iter().any(|q| !q.is_finite()) {
                return Err(PlannerError::GradientSolve(format!(
                    "non-finite value gradient at step {t}"
                )));
            }
            self.vx.copy_from_slice(&self.qx);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar_dims() -> ModelDims {
        ModelDims::vector_space(1, 1)
    }

    /// Fill a scalar system: x' = a*x + b*u, cost gradients cx, cu.
    fn scalar_problem(
        a: f64,
        b: f64,
        cx: f64,
        cu: f64,
        horizon: usize,
    ) -> (ModelJacobians, CostGradients) {
        let dims = scalar_dims();
        let mut jac = ModelJacobians::new(&dims);
        let mut grad = CostGradients::new(&dims);
        for t in 0..horizon - 1 {
            jac.a_at_mut(t)[0] = a;
            jac.b_at_mut(t)[0] = b;
            grad.cu_at_mut(t)[0] = cu;
        }
        for t in 0..horizon {
            grad.cx_at_mut(t)[0] = cx;
        }
        (jac, grad)
    }

    #[test]
    fn test_adjoint_scalar_two_steps() {
        let dims = scalar_dims();
        let (jac, grad) = scalar_problem(1.0, 0.1, 2.0, 0.5, 2);
        let mut solver = AdjointSolver::new(&dims);
        let mut direction = DescentDirection::new(&dims);
        solver.solve(&jac, &grad, 2, &mut direction).unwrap();

        // vx_terminal = cx = 2.0; qu = cu + b*vx = 0.5 + 0.2 = 0.7
        assert!((direction.k_at(0)[0] + 0.7).abs() < 1e-12);
        // dv[0] = qu * k = -qu^2
        assert!((direction.dv[0] + 0.49).abs() < 1e-12);
        assert!(direction.dv[0] < 0.0);
    }

    #[test]
    fn test_adjoint_accumulates_through_dynamics() {
        let dims = scalar_dims();
        let (jac, grad) = scalar_problem(2.0, 1.0, 1.0, 0.0, 3);
        let mut solver = AdjointSolver::new(&dims);
        let mut direction = DescentDirection::new(&dims);
        solver.solve(&jac, &grad, 3, &mut direction).unwrap();

        // backward from t=1: vx = 1; qu_1 = 0 + 1*1 = 1; k_1 = -1
        assert!((direction.k_at(1)[0] + 1.0).abs() < 1e-12);
        // vx <- cx + a*vx = 1 + 2 = 3; qu_0 = 3; k_0 = -3
        assert!((direction.k_at(0)[0] + 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_non_finite_gradient_fails() {
        let dims = scalar_dims();
        let (jac, mut grad) = scalar_problem(1.0, 1.0, 1.0, 0.0, 3);
        grad.cu_at_mut(1)[0] = f64::NAN;
        let mut solver = AdjointSolver::new(&dims);
        let mut direction = DescentDirection::new(&dims);
        let result = solver.solve(&jac, &grad, 3, &mut direction);
        assert!(matches!(result, Err(PlannerError::GradientSolve(_))));
    }
}
