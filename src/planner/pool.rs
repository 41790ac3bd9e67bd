//! Candidate slots evaluated in parallel during line search.

use std::sync::{Arc, Mutex};

use crate::core::ModelDims;
use crate::error::Result;
use crate::spline::{SplineKind, SplinePolicy};
use crate::trajectory::Trajectory;

/// Compile-time cap on line-search candidates per planning call.
pub const MAX_CANDIDATES: usize = 128;

/// One line-search candidate: a stepped policy, the trajectory it
/// produced, and its cost.
#[derive(Debug)]
pub struct CandidateSlot {
    /// Candidate policy. Slot 0 holds the working nominal between
    /// rollout batches.
    pub policy: SplinePolicy,
    /// Rollout result for this candidate.
    pub trajectory: Trajectory,
    /// Line-search step size applied before the rollout.
    pub step_size: f64,
    /// Total return of the last rollout, `+inf` until rolled out.
    pub cost: f64,
}

/// Fixed set of candidate slots, each independently lockable so
/// rollout tasks on different slots never contend.
pub struct CandidatePool {
    slots: Vec<Arc<Mutex<CandidateSlot>>>,
}

impl CandidatePool {
    /// Allocate `capacity` slots (clamped to [`MAX_CANDIDATES`]).
    pub fn new(
        dims: &ModelDims,
        num_residual: usize,
        kind: SplineKind,
        num_knots: usize,
        capacity: usize,
    ) -> Result<Self> {
        let capacity = capacity.min(MAX_CANDIDATES).max(1);
        let mut slots = Vec::with_capacity(capacity);
        for _ in 0..capacity {
            slots.push(Arc::new(Mutex::new(CandidateSlot {
                policy: SplinePolicy::new(kind, dims.action, num_knots)?,
                trajectory: Trajectory::new(dims, num_residual),
                step_size: 0.0,
                cost: f64::INFINITY,
            })));
        }
        Ok(Self { slots })
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Shared handle to slot `index`.
    pub fn slot(&self, index: usize) -> Arc<Mutex<CandidateSlot>> {
        Arc::clone(&self.slots[index])
    }

    /// Copy slot 0's policy into slots `1..active` and assign each
    /// active slot its step size.
    pub fn stage_candidates(&self, active: usize, step_sizes: &[f64]) {
        debug_assert!(active <= self.slots.len());
        debug_assert!(step_sizes.len() >= active);
        let source = self.slots[0].lock().unwrap();
        for (i, slot) in self.slots.iter().enumerate().take(active) {
            if i == 0 {
                continue;
            }
            let mut slot = slot.lock().unwrap();
            slot.policy.copy_from(&source.policy);
            slot.step_size = step_sizes[i];
            slot.cost = f64::INFINITY;
        }
        drop(source);
        let mut first = self.slots[0].lock().unwrap();
        first.step_size = step_sizes[0];
        first.cost = f64::INFINITY;
    }

    /// Zero every slot (episode reset).
    pub fn reset(&self) {
        for slot in &self.slots {
            let mut slot = slot.lock().unwrap();
            slot.policy.reset();
            let _ = slot.trajectory.reset(0);
            slot.step_size = 0.0;
            slot.cost = f64::INFINITY;
        }
    }

    /// Pick the winning candidate among slots `0..active`.
    ///
    /// Scans from the highest index down with a strict `<` against the
    /// running best, so ties resolve to the highest index — the
    /// smallest step size. Non-finite costs are treated as `+inf` and
    /// never win. Returns `(winner, best_cost)`; when nothing improves,
    /// the winner is the zero-step slot `active - 1` and `best_cost` is
    /// unchanged.
    pub fn select_winner(&self, active: usize, best_cost: f64) -> (usize, f64) {
        let mut winner = active - 1;
        let mut best = best_cost;
        for i in (0..active).rev() {
            let cost = self.slots[i].lock().unwrap().cost;
            let cost = if cost.is_finite() { cost } else { f64::INFINITY };
            if cost < best {
                best = cost;
                winner = i;
            }
        }
        (winner, best)
    }
}
