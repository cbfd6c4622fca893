//! A small bounded worker pool used by the warm-up orchestrator to open partitions
//! concurrently, and optionally by the dispatch layer's multi-key `get` to probe several
//! partitions at once.
//!
//! This crate is otherwise entirely synchronous, so a `tokio` runtime would be the wrong tool;
//! the pool is hand-rolled on `std::thread` and `std::sync::mpsc` instead, a "just enough
//! concurrency primitive, nothing pulled in for it" approach.

use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A bounded pool of worker threads pulling closures off a shared queue.
pub struct WorkerPool {
    sender: Option<mpsc::Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `size` worker threads named `"<name_prefix>-worker-N"`. `size` is clamped to at
    /// least 1. Thread pool size for the Warm-up Orchestrator is
    /// `max(partitionCount, hardwareParallelism) + 1`; the name prefix is the table's
    /// partition-filename prefix, so a thread dump identifies which split table it belongs to.
    pub fn new(size: usize, name_prefix: &str) -> Self {
        let size = size.max(1);
        let (sender, receiver) = mpsc::channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));

        let workers = (0..size)
            .map(|i| {
                let receiver = receiver.clone();
                thread::Builder::new()
                    .name(format!("{name_prefix}-worker-{i}"))
                    .spawn(move || loop {
                        let job = {
                            let receiver = receiver.lock().unwrap();
                            receiver.recv()
                        };
                        match job {
                            Ok(job) => job(),
                            Err(_) => break,
                        }
                    })
                    .expect("failed to spawn worker thread")
            })
            .collect();

        Self {
            sender: Some(sender),
            workers,
        }
    }

    /// Submits a job to the pool. Ignored if the pool's channel has already been torn down.
    pub fn submit(&self, job: impl FnOnce() + Send + 'static) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(Box::new(job));
        }
    }

    /// Runs `jobs` across the pool and blocks until every one has completed, collecting their
    /// results in submission order. Used by the Warm-up Orchestrator as its opening barrier
    /// all partitions must finish opening before the table becomes available.
    pub fn run_to_completion<T, F>(&self, jobs: Vec<F>) -> Vec<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let count = jobs.len();
        for (index, job) in jobs.into_iter().enumerate() {
            let tx = tx.clone();
            self.submit(move || {
                let result = job();
                let _ = tx.send((index, result));
            });
        }
        drop(tx);

        let mut slots: Vec<Option<T>> = (0..count).map(|_| None).collect();
        for _ in 0..count {
            if let Ok((index, result)) = rx.recv() {
                slots[index] = Some(result);
            }
        }
        slots.into_iter().map(|s| s.expect("every job reports back")).collect()
    }

    /// Like `run_to_completion`, but for callers that need to observe a worker thread failing
    /// mid-job rather than letting it take the whole pool down: if any job's worker unwinds
    /// before reporting back, returns `None` instead of panicking the caller. Used by batch
    /// `get`, where the spec surfaces such an interruption to the caller rather than swallowing
    /// it the way warm-up does.
    pub fn try_run_to_completion<T, F>(&self, jobs: Vec<F>) -> Option<Vec<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let count = jobs.len();
        for (index, job) in jobs.into_iter().enumerate() {
            let tx = tx.clone();
            self.submit(move || {
                if let Ok(result) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(job)) {
                    let _ = tx.send((index, result));
                }
            });
        }
        drop(tx);

        let mut slots: Vec<Option<T>> = (0..count).map(|_| None).collect();
        for _ in 0..count {
            match rx.recv() {
                Ok((index, result)) => slots[index] = Some(result),
                Err(_) => break,
            }
        }
        slots.into_iter().collect()
    }

    /// Stops accepting new work and waits up to `deadline` for workers to drain. `std::thread`'s
    /// `JoinHandle` has no timed join, so this polls `is_finished()` instead; a worker still
    /// running past the deadline is left detached rather than blocking shutdown indefinitely
    /// closing the table does not promise to wait forever for in-flight warm-up work.
    pub fn shutdown(mut self, deadline: Duration) {
        self.sender.take();
        let start = Instant::now();
        let mut remaining: Vec<JoinHandle<()>> = self.workers.drain(..).collect();

        while !remaining.is_empty() && start.elapsed() < deadline {
            remaining.retain(|h| !h.is_finished());
            if !remaining.is_empty() {
                thread::sleep(Duration::from_millis(10));
            }
        }
        for handle in remaining {
            let _ = handle.join();
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.sender.take();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn runs_all_jobs_to_completion() {
        let pool = WorkerPool::new(4, "test");
        let jobs: Vec<_> = (0..20).map(|i| move || i * 2).collect();
        let results = pool.run_to_completion(jobs);
        assert_eq!(results, (0..20).map(|i| i * 2).collect::<Vec<_>>());
    }

    #[test]
    fn try_run_to_completion_reports_interruption() {
        let pool = WorkerPool::new(4, "test");
        let jobs: Vec<Box<dyn FnOnce() -> u32 + Send>> = vec![
            Box::new(|| 1),
            Box::new(|| panic!("simulated worker failure")),
            Box::new(|| 3),
        ];
        let result = pool.try_run_to_completion(jobs);
        assert!(result.is_none());
    }

    #[test]
    fn submit_runs_concurrently() {
        let pool = WorkerPool::new(4, "test");
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..10 {
            let counter = counter.clone();
            pool.submit(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        pool.shutdown(Duration::from_secs(3));
        assert_eq!(counter.load(Ordering::SeqCst), 10);
    }
}
