//! Simulation model contract and per-worker scratch buffers.

use crate::core::ModelDims;

/// Mutable simulation scratch for one rollout.
///
/// One `SimData` exists per worker slot; it is reused across planning
/// calls and episodes, and only re-zeroed on planner reset. No two
/// concurrent rollout tasks ever share one.
#[derive(Debug, Clone)]
pub struct SimData {
    /// Current state vector.
    pub state: Vec<f64>,
    /// Auxiliary state (externally driven targets, mocap-like).
    pub aux: Vec<f64>,
    /// Simulation time.
    pub time: f64,
}

impl SimData {
    /// Allocate scratch sized for a model.
    pub fn new(dims: &ModelDims) -> Self {
        Self {
            state: vec![0.0; dims.state],
            aux: vec![0.0; dims.aux],
            time: 0.0,
        }
    }

    /// Zero all contents.
    pub fn reset(&mut self) {
        self.state.fill(0.0);
        self.aux.fill(0.0);
        self.time = 0.0;
    }

    /// Load an initial condition.
    pub fn load(&mut self, state: &[f64], aux: &[f64], time: f64) {
        self.state.copy_from_slice(state);
        self.aux.copy_from_slice(aux);
        self.time = time;
    }
}

/// Read-only simulation model handle.
///
/// Implementations must be deterministic: stepping the same state with
/// the same action always produces the same next state.
pub trait DynamicsModel: Send + Sync {
    /// Model dimensions. Must be constant over the model's lifetime.
    fn dims(&self) -> ModelDims;

    /// Integration time step.
    fn timestep(&self) -> f64;

    /// Advance `data.state` and `data.time` by one time step under `action`.
    fn step(&self, data: &mut SimData, action: &[f64]);

    /// 3-D position trace for diagnostics (e.g. an end-effector site).
    fn position_trace(&self, _data: &SimData) -> [f64; 3] {
        [0.0; 3]
    }
}
