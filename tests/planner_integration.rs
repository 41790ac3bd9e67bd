//! Planner Integration Tests
//!
//! End-to-end planning on a synthetic point-mass model with
//! finite-difference derivative kernels. Verifies:
//! - Published cost never regresses across planning calls
//! - A pure ascent direction falls back to the zero-step candidate
//! - Candidate batches larger than the worker pool still complete
//! - Single-worker planning is bitwise deterministic
//!
//! Run with: `cargo test --test planner_integration`

use std::sync::Arc;

use yantra_mpc::derivatives::{
    AdjointSolver, CostDerivatives, CostGradients, DescentDirection, GradientSolver,
    ModelDerivatives, ModelJacobians,
};
use yantra_mpc::{
    DynamicsModel, GradientPlanner, GradientPlannerConfig, ModelDims, NormKind, NormSpec,
    ResidualFn, Result, SimData, SplineKind, StateSnapshot, Task, Trajectory,
};

// ============================================================================
// Test Fixtures
// ============================================================================

const DT: f64 = 0.05;
const FD_EPS: f64 = 1.0e-6;

/// Point mass on a line: state [x, v], action [f].
/// Semi-implicit Euler: v += f*dt, x += v*dt.
struct PointMass;

impl DynamicsModel for PointMass {
    fn dims(&self) -> ModelDims {
        ModelDims::vector_space(2, 1)
    }
    fn timestep(&self) -> f64 {
        DT
    }
    fn step(&self, data: &mut SimData, action: &[f64]) {
        data.state[1] += action[0] * DT;
        data.state[0] += data.state[1] * DT;
        data.time += DT;
    }
    fn position_trace(&self, data: &SimData) -> [f64; 3] {
        [data.state[0], 0.0, 0.0]
    }
}

/// Residual: [x, v, f] with a heavy state group and light effort group.
struct RegulatorResidual;

impl ResidualFn for RegulatorResidual {
    fn residual(&self, data: &SimData, action: &[f64], out: &mut [f64]) {
        out[0] = data.state[0];
        out[1] = data.state[1];
        out[2] = action[0];
    }
}

fn regulator_task() -> Arc<Task> {
    Arc::new(
        Task::new(
            Arc::new(RegulatorResidual),
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
                    dim: 1,
                    param: 0.0,
                },
            ],
            0.0,
        )
        .unwrap(),
    )
}

/// Central-difference dynamics Jacobians.
struct FdModelDerivatives {
    data: SimData,
}

impl FdModelDerivatives {
    fn new(dims: &ModelDims) -> Self {
        Self {
            data: SimData::new(dims),
        }
    }

    fn step_from(
        &mut self,
        model: &dyn DynamicsModel,
        state: &[f64],
        action: &[f64],
        time: f64,
    ) -> Vec<f64> {
        self.data.load(state, &[], time);
        model.step(&mut self.data, action);
        self.data.state.clone()
    }
}

impl ModelDerivatives for FdModelDerivatives {
    fn compute(
        &mut self,
        model: &dyn DynamicsModel,
        trajectory: &Trajectory,
        out: &mut ModelJacobians,
    ) -> Result<()> {
        let nx = trajectory.dim_state();
        let nu = trajectory.dim_action();
        for t in 0..trajectory.horizon - 1 {
            let base = trajectory.state_at(t).to_vec();
            let action = trajectory.action_at(t).to_vec();
            let time = trajectory.times[t];

            for j in 0..nx {
                let mut up = base.clone();
                up[j] += FD_EPS;
                let plus = self.step_from(model, &up, &action, time);
                let mut down = base.clone();
                down[j] -= FD_EPS;
                let minus = self.step_from(model, &down, &action, time);
                for i in 0..nx {
                    out.a_at_mut(t)[i * nx + j] = (plus[i] - minus[i]) / (2.0 * FD_EPS);
                }
            }

            for j in 0..nu {
                let mut up = action.clone();
                up[j] += FD_EPS;
                let plus = self.step_from(model, &base, &up, time);
                let mut down = action.clone();
                down[j] -= FD_EPS;
                let minus = self.step_from(model, &base, &down, time);
                for i in 0..nx {
                    out.b_at_mut(t)[i * nu + j] = (plus[i] - minus[i]) / (2.0 * FD_EPS);
                }
            }
        }
        Ok(())
    }
}

/// Central-difference cost gradients.
struct FdCostDerivatives {
    data: SimData,
    residual: Vec<f64>,
}

impl FdCostDerivatives {
    fn new(dims: &ModelDims, num_residual: usize) -> Self {
        Self {
            data: SimData::new(dims),
            residual: vec![0.0; num_residual],
        }
    }

    fn cost_at(&mut self, task: &Task, state: &[f64], action: &[f64], time: f64) -> f64 {
        self.data.load(state, &[], time);
        task.residual(&self.data, action, &mut self.residual);
        task.cost_value(&self.residual)
    }
}

impl CostDerivatives for FdCostDerivatives {
    fn compute(
        &mut self,
        _model: &dyn DynamicsModel,
        task: &Task,
        trajectory: &Trajectory,
        out: &mut CostGradients,
    ) -> Result<()> {
        let nx = trajectory.dim_state();
        let nu = trajectory.dim_action();
        for t in 0..trajectory.horizon {
            let base = trajectory.state_at(t).to_vec();
            let action = trajectory.action_at(t).to_vec();
            let time = trajectory.times[t];
            for j in 0..nx {
                let mut up_state = base.clone();
                up_state[j] += FD_EPS;
                let up = self.cost_at(task, &up_state, &action, time);
                let mut down_state = base.clone();
                down_state[j] -= FD_EPS;
                let down = self.cost_at(task, &down_state, &action, time);
                out.cx_at_mut(t)[j] = (up - down) / (2.0 * FD_EPS);
            }
            if t + 1 < trajectory.horizon {
                for j in 0..nu {
                    let mut up_action = action.clone();
                    up_action[j] += FD_EPS;
                    let up = self.cost_at(task, &base, &up_action, time);
                    let mut down_action = action.clone();
                    down_action[j] -= FD_EPS;
                    let down = self.cost_at(task, &base, &down_action, time);
                    out.cu_at_mut(t)[j] = (up - down) / (2.0 * FD_EPS);
                }
            }
        }
        Ok(())
    }
}

/// Flips the descent direction into an ascent direction.
struct AscentSolver {
    inner: AdjointSolver,
}

impl GradientSolver for AscentSolver {
    fn solve(
        &mut self,
        jacobians: &ModelJacobians,
        gradients: &CostGradients,
        horizon: usize,
        out: &mut DescentDirection,
    ) -> Result<()> {
        self.inner.solve(jacobians, gradients, horizon, out)?;
        for k in out.k.iter_mut() {
            *k = -*k;
        }
        out.dv[0] = -out.dv[0];
        Ok(())
    }
}

fn build_planner(config: GradientPlannerConfig) -> GradientPlanner {
    let model: Arc<dyn DynamicsModel> = Arc::new(PointMass);
    let dims = model.dims();
    let task = regulator_task();
    let num_residual = task.num_residual();
    GradientPlanner::new(
        model,
        task,
        config,
        Box::new(FdModelDerivatives::new(&dims)),
        Box::new(FdCostDerivatives::new(&dims, num_residual)),
        Box::new(AdjointSolver::new(&dims)),
    )
    .unwrap()
}

fn small_config() -> GradientPlannerConfig {
    GradientPlannerConfig {
        num_trajectory: 8,
        num_knots: 6,
        num_threads: 2,
        spline_kind: SplineKind::Linear,
        ..GradientPlannerConfig::default()
    }
}

fn offset_snapshot() -> StateSnapshot {
    StateSnapshot::new(vec![1.0, 0.0], vec![], 0.0)
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_planning_never_regresses() {
    let mut planner = build_planner(small_config());
    planner.set_state(&offset_snapshot());

    for _ in 0..5 {
        planner.optimize(40).unwrap();
        let diagnostics = planner.diagnostics();
        assert!(diagnostics.improvement >= 0.0);
        assert!(diagnostics.surprise >= 0.0 && diagnostics.surprise <= 2.0);
    }
}

#[test]
fn test_planner_regulates_point_mass() {
    let mut planner = build_planner(small_config());
    let handle = planner.policy_handle();
    planner.set_state(&offset_snapshot());
    planner.optimize(40).unwrap();
    assert!(planner.diagnostics().improvement > 0.0);

    // drive the simulated mass with the published policy
    let model = PointMass;
    let mut data = SimData::new(&model.dims());
    data.load(&[1.0, 0.0], &[], 0.0);
    let mut action = [0.0];
    for _ in 0..39 {
        handle.action(data.time, &mut action);
        model.step(&mut data, &action);
    }
    // the mass moved toward the origin, not away
    assert!(data.state[0].abs() < 1.0);
}

#[test]
fn test_ascent_direction_falls_back_to_identity() {
    let model: Arc<dyn DynamicsModel> = Arc::new(PointMass);
    let dims = model.dims();
    let task = regulator_task();
    let num_residual = task.num_residual();
    let config = small_config();
    let num_trajectory = config.num_trajectory;
    let mut planner = GradientPlanner::new(
        model,
        task,
        config,
        Box::new(FdModelDerivatives::new(&dims)),
        Box::new(FdCostDerivatives::new(&dims, num_residual)),
        Box::new(AscentSolver {
            inner: AdjointSolver::new(&dims),
        }),
    )
    .unwrap();

    planner.set_state(&offset_snapshot());
    planner.optimize(40).unwrap();

    let diagnostics = planner.diagnostics();
    assert_eq!(diagnostics.winner, num_trajectory - 1);
    assert_eq!(diagnostics.step_size, 0.0);
    assert_eq!(diagnostics.improvement, 0.0);
}

#[test]
fn test_oversubscribed_worker_pool_completes() {
    let config = GradientPlannerConfig {
        num_trajectory: 16,
        num_threads: 2,
        num_knots: 6,
        ..GradientPlannerConfig::default()
    };
    let mut planner = build_planner(config);
    planner.set_state(&offset_snapshot());
    planner.optimize(30).unwrap();

    let diagnostics = planner.diagnostics();
    assert!(diagnostics.winner < 16);
    assert!(diagnostics.improvement.is_finite());
}

#[test]
fn test_single_worker_planning_is_deterministic() {
    let config = GradientPlannerConfig {
        num_threads: 1,
        ..small_config()
    };

    let run = |config: GradientPlannerConfig| {
        let mut planner = build_planner(config);
        let handle = planner.policy_handle();
        planner.set_state(&offset_snapshot());
        planner.optimize(40).unwrap();
        planner.optimize(40).unwrap();
        handle.snapshot()
    };

    let first = run(config.clone());
    let second = run(config);
    // bitwise identical published policies
    assert_eq!(first.parameters(), second.parameters());
    assert_eq!(first.times(), second.times());
}
