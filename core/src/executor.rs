//! Executors run the blocking part of asynchronous invocations.
//!
//! # Design
//! An executor accepts a unit of work and guarantees it eventually runs
//! once, on a thread it manages. Nothing else is promised: no ordering
//! between units and no cancellation. A unit that is dropped without running
//! (pool shut down, job panicked) drops its completion handle with it, which
//! the waiting caller observes as `InvocationError::Abandoned`.

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{mpsc, Arc};
use std::thread;

use parking_lot::Mutex;
use tracing::{error, warn};

/// One unit of work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

pub trait Executor: Send + Sync {
    fn execute(&self, job: Job);
}

/// Fixed-size pool of named worker threads.
pub struct ThreadPool {
    sender: Option<mpsc::Sender<Job>>,
    workers: Vec<thread::JoinHandle<()>>,
}

impl ThreadPool {
    pub fn new(size: usize) -> io::Result<Self> {
        let size = size.max(1);
        let (sender, receiver) = mpsc::channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));

        let mut workers = Vec::with_capacity(size);
        for i in 0..size {
            let receiver = Arc::clone(&receiver);
            let worker = thread::Builder::new()
                .name(format!("remote-worker-{i}"))
                .spawn(move || loop {
                    let job = receiver.lock().recv();
                    match job {
                        Ok(job) => {
                            if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                                error!(worker = i, "unit of work panicked");
                            }
                        }
                        Err(_) => break,
                    }
                })?;
            workers.push(worker);
        }

        Ok(Self {
            sender: Some(sender),
            workers,
        })
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }
}

impl Executor for ThreadPool {
    fn execute(&self, job: Job) {
        let Some(sender) = &self.sender else {
            return;
        };
        if sender.send(job).is_err() {
            warn!("thread pool is shut down; unit of work dropped");
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        drop(self.sender.take());
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                error!("worker thread terminated abnormally");
            }
        }
    }
}

/// Runs each unit on a tokio runtime's blocking thread pool.
#[derive(Debug, Clone)]
pub struct TokioExecutor {
    handle: tokio::runtime::Handle,
}

impl TokioExecutor {
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Bind to the runtime the caller is running on, if any.
    pub fn current() -> Option<Self> {
        tokio::runtime::Handle::try_current().ok().map(Self::new)
    }
}

impl Executor for TokioExecutor {
    fn execute(&self, job: Job) {
        drop(self.handle.spawn_blocking(job));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;

    use super::*;

    #[test]
    fn pool_runs_every_job_off_the_caller_thread() {
        let pool = ThreadPool::new(3).unwrap();
        assert_eq!(pool.size(), 3);
        let caller = thread::current().id();
        let (tx, rx) = mpsc::channel();
        for _ in 0..9 {
            let tx = tx.clone();
            pool.execute(Box::new(move || {
                tx.send(thread::current().id()).unwrap();
            }));
        }
        drop(tx);
        let ids: Vec<_> = rx.iter().collect();
        assert_eq!(ids.len(), 9);
        assert!(ids.iter().all(|id| *id != caller));
    }

    #[test]
    fn pool_runs_jobs_concurrently() {
        let pool = ThreadPool::new(2).unwrap();
        let barrier = Arc::new(Barrier::new(2));
        let done = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = mpsc::channel();
        for _ in 0..2 {
            let barrier = Arc::clone(&barrier);
            let done = Arc::clone(&done);
            let tx = tx.clone();
            pool.execute(Box::new(move || {
                barrier.wait();
                done.fetch_add(1, Ordering::SeqCst);
                tx.send(()).unwrap();
            }));
        }
        rx.recv().unwrap();
        rx.recv().unwrap();
        assert_eq!(done.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn panicking_job_does_not_kill_the_worker() {
        let pool = ThreadPool::new(1).unwrap();
        pool.execute(Box::new(|| panic!("boom")));
        let (tx, rx) = mpsc::channel();
        pool.execute(Box::new(move || tx.send(7).unwrap()));
        assert_eq!(rx.recv().unwrap(), 7);
    }
}
