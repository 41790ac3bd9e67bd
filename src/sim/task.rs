//! Task cost: residual contract, per-group norms, risk-sensitive total.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{PlannerError, Result};
use crate::sim::model::SimData;

/// Residual function supplied by the task author.
///
/// Fills `out` (length = task residual dimension) from the current
/// simulation state and the action applied at this step.
pub trait ResidualFn: Send + Sync {
    fn residual(&self, data: &SimData, action: &[f64], out: &mut [f64]);
}

/// Norm applied to one residual group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormKind {
    /// `0.5 * x'x`
    Quadratic,
    /// `sqrt(x'x + p^2) - p`, a smooth absolute value with corner
    /// radius `p`.
    SmoothAbs,
}

impl NormKind {
    fn value(self, x: &[f64], param: f64) -> f64 {
        let sq: f64 = x.iter().map(|v| v * v).sum();
        match self {
            NormKind::Quadratic => 0.5 * sq,
            NormKind::SmoothAbs => (sq + param * param).sqrt() - param,
        }
    }
}

/// One weighted norm group over a contiguous residual slice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormSpec {
    /// Norm kind.
    pub kind: NormKind,
    /// Group weight.
    pub weight: f64,
    /// Number of residual entries in this group.
    pub dim: usize,
    /// Norm parameter (corner radius for `SmoothAbs`, unused otherwise).
    pub param: f64,
}

/// Task-defined cost over rollout residuals.
///
/// The total per-step cost is the risk-sensitive transform of the
/// summed group terms: `(exp(risk * sum) - 1) / risk`, reducing to the
/// plain sum when `risk == 0`.
#[derive(Clone)]
pub struct Task {
    /// Risk parameter. Positive trades mean for variance aversion.
    pub risk: f64,
    norms: Vec<NormSpec>,
    num_residual: usize,
    residual_fn: Arc<dyn ResidualFn>,
}

impl Task {
    /// Create a task from a residual function and norm groups.
    pub fn new(residual_fn: Arc<dyn ResidualFn>, norms: Vec<NormSpec>, risk: f64) -> Result<Self> {
        if norms.is_empty() {
            return Err(PlannerError::Config("task has no norm groups".into()));
        }
        for (i, norm) in norms.iter().enumerate() {
            if norm.dim == 0 {
                return Err(PlannerError::Config(format!("norm group {i} has zero dim")));
            }
            if !norm.weight.is_finite() || norm.weight < 0.0 {
                return Err(PlannerError::Config(format!(
                    "norm group {i} has invalid weight {}",
                    norm.weight
                )));
            }
        }
        if !risk.is_finite() {
            return Err(PlannerError::Config(format!("invalid risk {risk}")));
        }
        let num_residual = norms.iter().map(|n| n.dim).sum();
        Ok(Self {
            risk,
            norms,
            num_residual,
            residual_fn,
        })
    }

    /// Total residual dimension (sum of group dims).
    pub fn num_residual(&self) -> usize {
        self.num_residual
    }

    /// Number of norm groups.
    pub fn num_norms(&self) -> usize {
        self.norms.len()
    }

    /// Norm group specs.
    pub fn norms(&self) -> &[NormSpec] {
        &self.norms
    }

    /// Evaluate the task residual at the current simulation state.
    pub fn residual(&self, data: &SimData, action: &[f64], out: &mut [f64]) {
        debug_assert_eq!(out.len(), self.num_residual);
        self.residual_fn.residual(data, action, out);
    }

    /// Per-group weighted costs: `terms[k] = weight_k * norm_k(residual_k)`.
    pub fn cost_terms(&self, residual: &[f64], terms: &mut [f64]) {
        debug_assert_eq!(residual.len(), self.num_residual);
        debug_assert_eq!(terms.len(), self.norms.len());
        let mut offset = 0;
        for (term, norm) in terms.iter_mut().zip(&self.norms) {
            let slice = &residual[offset..offset + norm.dim];
            *term = norm.weight * norm.kind.value(slice, norm.param);
            offset += norm.dim;
        }
    }

    /// Risk-transformed scalar cost over all groups.
    ///
    /// `risk == 0` must bypass the exponential transform exactly; the
    /// general formula divides by `risk`.
    pub fn cost_value(&self, residual: &[f64]) -> f64 {
        let mut sum = 0.0;
        let mut offset = 0;
        for norm in &self.norms {
            let slice = &residual[offset..offset + norm.dim];
            sum += norm.weight * norm.kind.value(slice, norm.param);
            offset += norm.dim;
        }
        if self.risk == 0.0 {
            sum
        } else {
            ((self.risk * sum).exp() - 1.0) / self.risk
        }
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("risk", &self.risk)
            .field("norms", &self.norms)
            .field("num_residual", &self.num_residual)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullResidual;

    impl ResidualFn for NullResidual {
        fn residual(&self, _data: &SimData, _action: &[f64], out: &mut [f64]) {
            out.fill(0.0);
        }
    }

    fn two_group_task(risk: f64) -> Task {
        Task::new(
            Arc::new(NullResidual),
            vec![
                NormSpec {
                    kind: NormKind::Quadratic,
                    weight: 5.0,
                    dim: 2,
                    param: 0.0,
                },
                NormSpec {
                    kind: NormKind::Quadratic,
                    weight: 0.1,
                    dim: 2,
                    param: 0.0,
                },
            ],
            risk,
        )
        .unwrap()
    }

    #[test]
    fn test_cost_terms_quadratic_groups() {
        let task = two_group_task(0.0);
        let residual = [1.0e-3, 2.0e-3, 3.0e-3, 4.0e-3];
        let mut terms = [0.0; 2];
        task.cost_terms(&residual, &mut terms);

        let expected0 = 5.0 * 0.5 * (1.0e-6 + 4.0e-6);
        let expected1 = 0.1 * 0.5 * (9.0e-6 + 16.0e-6);
        assert!((terms[0] - expected0).abs() < 1e-12);
        assert!((terms[1] - expected1).abs() < 1e-12);
        assert!((terms.iter().sum::<f64>() - 1.375e-5).abs() < 1e-12);
    }

    #[test]
    fn test_cost_value_risk_zero_is_exact_sum() {
        let task = two_group_task(0.0);
        let residual = [1.0e-3, 2.0e-3, 3.0e-3, 4.0e-3];
        let mut terms = [0.0; 2];
        task.cost_terms(&residual, &mut terms);
        // risk == 0 takes the plain-sum branch, bitwise equal to the
        // summed group terms
        assert_eq!(task.cost_value(&residual), terms.iter().sum::<f64>());
        assert!((task.cost_value(&residual) - 1.375e-5).abs() < 1e-18);
    }

    #[test]
    fn test_cost_value_risk_transform() {
        let task = two_group_task(0.2);
        let residual = [1.0e-3, 2.0e-3, 3.0e-3, 4.0e-3];
        let sum: f64 = 1.375e-5;
        let expected = ((0.2 * sum).exp() - 1.0) / 0.2;
        assert!((task.cost_value(&residual) - expected).abs() < 1e-12);
        // at this magnitude the transform matches the linear sum to 5 decimals
        assert!((task.cost_value(&residual) - sum).abs() < 1e-5);
    }

    #[test]
    fn test_smooth_abs_norm() {
        let x = [3.0, 4.0];
        // sqrt(25 + 0.01) - 0.1
        let value = NormKind::SmoothAbs.value(&x, 0.1);
        assert!((value - (25.01f64.sqrt() - 0.1)).abs() < 1e-12);
        // tends to |x| as param -> 0
        assert!((NormKind::SmoothAbs.value(&x, 0.0) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_empty_norms() {
        assert!(Task::new(Arc::new(NullResidual), vec![], 0.0).is_err());
    }

    #[test]
    fn test_rejects_negative_weight() {
        let result = Task::new(
            Arc::new(NullResidual),
            vec![NormSpec {
                kind: NormKind::Quadratic,
                weight: -1.0,
                dim: 2,
                param: 0.0,
            }],
            0.0,
        );
        assert!(result.is_err());
    }
}
