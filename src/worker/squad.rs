//! Fixed-size worker pool dispatching one named parallel task at a time.
//!
//! The original squad is a persistent pool of threads parked on "have job"
//! events, woken by the dispatcher, and re-parked after signalling "free".
//! This port gets the same contract — a fixed worker count, linear segment
//! partitioning, and "every worker finished or the dispatcher learns why
//! not" — from `std::thread::scope`: each `run_parallel` call spawns exactly
//! `worker_count` scoped threads and blocks until they all join, which is
//! `WaitTillAllFree` without a hand-rolled condvar state machine. A panic in
//! any worker surfaces as [`crate::error::CodecError::WorkerPanicked`]
//! instead of silently poisoning shared state.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{CodecError, CodecResult};

pub struct Squad {
    worker_count: usize,
}

impl Squad {
    pub fn new(worker_count: usize) -> Self {
        Self {
            worker_count: worker_count.max(1),
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Evenly partitions `total` items across `worker_count` workers.
    /// Degrades to "one item per worker, the rest get nothing" when
    /// `total < worker_count`, matching the original's `GetSegment`.
    pub fn segment(&self, total: usize, worker: usize) -> (usize, usize) {
        if worker >= self.worker_count {
            return (total, 0);
        }
        if total < self.worker_count {
            return if worker < total { (worker, 1) } else { (total, 0) };
        }
        let base = total / self.worker_count;
        let extra = total % self.worker_count;
        let start = worker * base + worker.min(extra);
        let size = base + if worker < extra { 1 } else { 0 };
        (start, size)
    }

    /// Runs `f(worker_index)` on every worker in parallel and waits for all
    /// of them to finish. Any panic inside `f` is caught and reported as a
    /// single [`CodecError::WorkerPanicked`] after every worker has had the
    /// chance to run.
    pub fn run_parallel<F>(&self, f: F) -> CodecResult<()>
    where
        F: Fn(usize) + Send + Sync,
    {
        let panicked = AtomicBool::new(false);
        std::thread::scope(|scope| {
            for idx in 0..self.worker_count {
                let f = &f;
                let panicked = &panicked;
                let builder = std::thread::Builder::new().name(format!("scpr-worker-{idx}"));
                builder
                    .spawn_scoped(scope, move || {
                        if catch_unwind(AssertUnwindSafe(|| f(idx))).is_err() {
                            panicked.store(true, Ordering::SeqCst);
                        }
                    })
                    .expect("spawning a scoped worker thread");
            }
        });
        if panicked.load(Ordering::SeqCst) {
            Err(CodecError::WorkerPanicked)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn segment_partitions_evenly() {
        let squad = Squad::new(4);
        let mut total = 0;
        for w in 0..4 {
            let (_, size) = squad.segment(10, w);
            total += size;
        }
        assert_eq!(total, 10);
    }

    #[test]
    fn segment_degrades_when_fewer_items_than_workers() {
        let squad = Squad::new(4);
        assert_eq!(squad.segment(2, 0), (0, 1));
        assert_eq!(squad.segment(2, 1), (1, 1));
        assert_eq!(squad.segment(2, 2), (2, 0));
        assert_eq!(squad.segment(2, 3), (2, 0));
    }

    #[test]
    fn run_parallel_invokes_every_worker() {
        let squad = Squad::new(4);
        let counter = AtomicUsize::new(0);
        squad.run_parallel(|_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn run_parallel_reports_panics() {
        let squad = Squad::new(4);
        let result = squad.run_parallel(|idx| {
            if idx == 2 {
                panic!("boom");
            }
        });
        assert!(result.is_err());
    }
}
