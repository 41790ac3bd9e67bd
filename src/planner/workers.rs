//! Fixed-size worker pool with counted-barrier completion tracking.

use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Worker pool consumed by the rollout scheduler.
///
/// Completion follows a counted-barrier protocol: schedule N jobs,
/// `wait_count(N)`, `reset_count()`. There is no timeout and no
/// cancellation; a stalled job stalls the barrier.
pub struct WorkerPool {
    sender: Option<Sender<Job>>,
    handles: Vec<JoinHandle<()>>,
    completed: Arc<(Mutex<usize>, Condvar)>,
    num_threads: usize,
}

impl WorkerPool {
    /// Spawn `num_threads` workers (at least one).
    pub fn new(num_threads: usize) -> Self {
        let num_threads = num_threads.max(1);
        let (sender, receiver) = crossbeam_channel::unbounded::<Job>();
        let completed = Arc::new((Mutex::new(0usize), Condvar::new()));

        let handles = (0..num_threads)
            .map(|i| {
                let receiver: Receiver<Job> = receiver.clone();
                let completed = Arc::clone(&completed);
                thread::Builder::new()
                    .name(format!("rollout-{i}"))
                    .spawn(move || {
                        while let Ok(job) = receiver.recv() {
                            job();
                            let (count, signal) = &*completed;
                            *count.lock().unwrap() += 1;
                            signal.notify_all();
                        }
                    })
                    .expect("Failed to spawn rollout worker")
            })
            .collect();

        Self {
            sender: Some(sender),
            handles,
            completed,
            num_threads,
        }
    }

    /// Number of worker threads.
    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Queue a job for execution.
    pub fn schedule(&self, job: impl FnOnce() + Send + 'static) {
        if let Some(sender) = &self.sender {
            // send only fails if all workers exited, which cannot
            // happen while the pool is alive
            let _ = sender.send(Box::new(job));
        }
    }

    /// Completed-job count since the last reset.
    pub fn count(&self) -> usize {
        *self.completed.0.lock().unwrap()
    }

    /// Block until the completed-job count reaches `n`.
    pub fn wait_count(&self, n: usize) {
        let (count, signal) = &*self.completed;
        let mut guard = count.lock().unwrap();
        while *guard < n {
            guard = signal.wait(guard).unwrap();
        }
    }

    /// Reset the completed-job count to zero.
    pub fn reset_count(&self) {
        *self.completed.0.lock().unwrap() = 0;
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // close the queue so workers exit their recv loops
        self.sender.take();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn test_barrier_completes_with_fewer_workers_than_tasks() {
        let pool = WorkerPool::new(2);
        let executed = Arc::new(AtomicUsize::new(0));

        let before = pool.count();
        for _ in 0..8 {
            let executed = Arc::clone(&executed);
            pool.schedule(move || {
                executed.fetch_add(1, Ordering::SeqCst);
            });
        }
        pool.wait_count(before + 8);
        pool.reset_count();

        // no lost or duplicated completions
        assert_eq!(executed.load(Ordering::SeqCst), 8);
        assert_eq!(pool.count(), 0);
    }

    #[test]
    fn test_count_accumulates_across_batches() {
        let pool = WorkerPool::new(1);
        pool.schedule(|| {});
        pool.wait_count(1);
        pool.schedule(|| {});
        pool.wait_count(2);
        assert_eq!(pool.count(), 2);
        pool.reset_count();
        assert_eq!(pool.count(), 0);
    }

    #[test]
    fn test_clamps_to_one_thread() {
        let pool = WorkerPool::new(0);
        assert_eq!(pool.num_threads(), 1);
        pool.schedule(|| {});
        pool.wait_count(1);
    }
}
