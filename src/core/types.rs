//! Dimension descriptors shared by the simulation and planning layers.

/// Dimensions of a simulation model.
///
/// All planner buffers are sized from these once, when the model is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelDims {
    /// Full state dimension (e.g. positions + velocities + actuator states).
    pub state: usize,
    /// State-derivative (tangent space) dimension. Equals `state` for
    /// models without quaternion-like coordinates.
    pub state_derivative: usize,
    /// Control dimension.
    pub action: usize,
    /// Sensor output dimension.
    pub sensor: usize,
    /// Auxiliary state dimension (externally driven targets, mocap-like).
    pub aux: usize,
}

impl ModelDims {
    /// Dimensions for a plain vector-space model (no quaternions, no aux).
    pub fn vector_space(state: usize, action: usize) -> Self {
        Self {
            state,
            state_derivative: state,
            action,
            sensor: 0,
            aux: 0,
        }
    }
}
