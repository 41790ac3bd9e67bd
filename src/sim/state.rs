//! State snapshot handed to the planner at the start of each call.

/// Copy-out snapshot of the system state.
///
/// Produced by the external state source (estimator or simulation) and
/// consumed once per planning call via [`StateSnapshot::copy_to`].
#[derive(Debug, Clone, Default)]
pub struct StateSnapshot {
    /// Flat state vector.
    pub state: Vec<f64>,
    /// Auxiliary state vector.
    pub aux: Vec<f64>,
    /// Time the snapshot was taken.
    pub time: f64,
}

impl StateSnapshot {
    /// Create a snapshot from owned buffers.
    pub fn new(state: Vec<f64>, aux: Vec<f64>, time: f64) -> Self {
        Self { state, aux, time }
    }

    /// Copy contents into planner-owned buffers.
    pub fn copy_to(&self, state: &mut [f64], aux: &mut [f64], time: &mut f64) {
        state.copy_from_slice(&self.state);
        aux.copy_from_slice(&self.aux);
        *time = self.time;
    }
}
