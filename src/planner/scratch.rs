//! Checkout pool of simulation scratch buffers.

use std::sync::{Arc, Condvar, Mutex};

use crate::core::ModelDims;
use crate::sim::SimData;

struct Inner {
    free: Mutex<Vec<SimData>>,
    available: Condvar,
}

/// Pool of [`SimData`] buffers shared by rollout tasks.
///
/// Buffers are checked out for the duration of one rollout and returned
/// on guard drop. Checkout blocks when the pool is empty, so at most
/// `capacity` rollouts touch simulation scratch at once and no buffer
/// is ever aliased.
#[derive(Clone)]
pub struct ScratchPool {
    inner: Arc<Inner>,
}

impl ScratchPool {
    /// Allocate `capacity` buffers sized for a model.
    pub fn new(dims: &ModelDims, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Arc::new(Inner {
                free: Mutex::new((0..capacity).map(|_| SimData::new(dims)).collect()),
                available: Condvar::new(),
            }),
        }
    }

    /// Zero every buffer currently in the pool. Callers must ensure no
    /// checkout is outstanding (episode reset).
    pub fn reset_all(&self) {
        let mut free = self.inner.free.lock().unwrap();
        for data in free.iter_mut() {
            data.reset();
        }
    }

    /// Check out a buffer, blocking until one is free.
    pub fn acquire(&self) -> ScratchGuard {
        let mut free = self.inner.free.lock().unwrap();
        loop {
            if let Some(data) = free.pop() {
                return ScratchGuard {
                    data: Some(data),
                    pool: Arc::clone(&self.inner),
                };
            }
            free = self.inner.available.wait(free).unwrap();
        }
    }
}

/// Checked-out scratch buffer; returns itself to the pool on drop.
pub struct ScratchGuard {
    data: Option<SimData>,
    pool: Arc<Inner>,
}

impl ScratchGuard {
    /// The checked-out buffer.
    pub fn data(&mut self) -> &mut SimData {
        self.data.as_mut().unwrap()
    }
}

impl Drop for ScratchGuard {
    fn drop(&mut self) {
        if let Some(data) = self.data.take() {
            self.pool.free.lock().unwrap().push(data);
            self.pool.available.notify_one();
        }
    }
}
