//! Parallel candidate rollouts over the worker pool.

use std::sync::Arc;

use crate::sim::{DynamicsModel, Task};

use super::pool::{CandidatePool, CandidateSlot};
use super::scratch::ScratchPool;
use super::workers::WorkerPool;

/// Shared inputs for one batch of candidate rollouts.
///
/// Built once per batch and handed to every rollout task; the initial
/// condition is frozen for the whole batch.
pub struct RolloutContext {
    /// Simulation model.
    pub model: Arc<dyn DynamicsModel>,
    /// Task cost.
    pub task: Arc<Task>,
    /// Initial state shared by all candidates.
    pub state: Vec<f64>,
    /// Initial auxiliary state.
    pub aux: Vec<f64>,
    /// Initial time.
    pub time: f64,
    /// Rollout horizon.
    pub horizon: usize,
}

/// Fans candidate rollouts out over the worker pool and blocks until
/// the whole batch lands.
pub struct RolloutScheduler {
    workers: WorkerPool,
    scratch: ScratchPool,
}

impl RolloutScheduler {
    /// Create a scheduler with `num_threads` workers and one scratch
    /// buffer per worker.
    pub fn new(dims: &crate::core::ModelDims, num_threads: usize) -> Self {
        let workers = WorkerPool::new(num_threads);
        let scratch = ScratchPool::new(dims, workers.num_threads());
        Self { workers, scratch }
    }

    /// Scratch pool, for rollouts run on the caller's thread.
    pub fn scratch(&self) -> &ScratchPool {
        &self.scratch
    }

    /// Roll out slots `0..active` in parallel and wait for all of them.
    ///
    /// Each task steps its slot's policy along the cached update
    /// direction by the slot's step size, simulates it from the shared
    /// initial condition, and records the total return in `slot.cost`.
    /// A failed rollout records `+inf` and never poisons the batch.
    pub fn rollout_all(&self, pool: &CandidatePool, active: usize, context: Arc<RolloutContext>) {
        self.workers.reset_count();
        for i in 0..active {
            let slot = pool.slot(i);
            let context = Arc::clone(&context);
            let scratch = self.scratch.clone();
            self.workers.schedule(move || {
                let mut guard = scratch.acquire();
                let mut slot = slot.lock().unwrap();
                rollout_candidate(&mut slot, &context, guard.data());
            });
        }
        self.workers.wait_count(active);
        self.workers.reset_count();
    }
}

fn rollout_candidate(
    slot: &mut CandidateSlot,
    context: &RolloutContext,
    data: &mut crate::sim::SimData,
) {
    if slot.step_size != 0.0 {
        slot.policy.apply_step(slot.step_size);
    }
    let CandidateSlot {
        policy, trajectory, ..
    } = slot;
    let result = trajectory.rollout(
        |action, _state, time| policy.evaluate(time, action),
        &context.task,
        context.model.as_ref(),
        data,
        &context.state,
        context.time,
        &context.aux,
        context.horizon,
    );
    slot.cost = match result {
        Ok(total) => total,
        Err(_) => f64::INFINITY,
    };
}
