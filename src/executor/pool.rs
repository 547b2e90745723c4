use super::job::{Job, TaskId};
use super::panic_handler::PanicHandler;
use super::worker::{Shared, Worker, WorkerId};
use crate::config::Config;
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Fixed-size pool of worker threads fed by an unbounded queue.
///
/// Every submitted job runs exactly once on one of the workers. There is no
/// ordering between jobs. A panicking job is caught at the worker boundary,
/// so the pool never loses capacity.
pub struct WorkerPool {
    workers: Mutex<Vec<WorkerHandle>>,
    unparkers: Vec<thread::Thread>,
    shared: Arc<Shared>,
    num_threads: usize,
    next_wake: AtomicUsize,
}

struct WorkerHandle {
    id: WorkerId,
    thread: Option<JoinHandle<()>>,
}

/// Point-in-time counters for a [`WorkerPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub workers: usize,
    pub submitted: u64,
    pub executed: u64,
    pub panicked: usize,
    pub pending: usize,
    pub active: usize,
}

impl WorkerPool {
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;

        let num_threads = config.worker_threads();

        let workers: Vec<Worker> = (0..num_threads).map(Worker::new).collect();
        let stealers = workers.iter().map(|w| w.local_queue.stealer()).collect();
        let shared = Arc::new(Shared::new(
            stealers,
            Arc::new(PanicHandler::new(config.panic_strategy)),
        ));

        let mut handles = Vec::with_capacity(num_threads);
        let mut unparkers: Vec<thread::Thread> = Vec::with_capacity(num_threads);

        for worker in workers {
            let id = worker.id;
            let shared_clone = shared.clone();
            let name = format!("{}-{}", config.thread_name_prefix, id);

            let mut builder = thread::Builder::new().name(name);

            if let Some(stack_size) = config.stack_size {
                builder = builder.stack_size(stack_size);
            }

            let spawned = builder.spawn(move || worker.run(shared_clone));

            let thread = match spawned {
                Ok(thread) => thread,
                Err(e) => {
                    // let the workers we already started exit
                    shared.shutdown.store(true, Ordering::SeqCst);
                    for unparker in &unparkers {
                        unparker.unpark();
                    }
                    return Err(Error::Spawn(e));
                }
            };

            unparkers.push(thread.thread().clone());
            handles.push(WorkerHandle {
                id,
                thread: Some(thread),
            });
        }

        tracing::debug!(
            workers = num_threads,
            prefix = %config.thread_name_prefix,
            "worker pool started"
        );

        Ok(Self {
            workers: Mutex::new(handles),
            unparkers,
            shared,
            num_threads,
            next_wake: AtomicUsize::new(0),
        })
    }

    /// Pool with `n` workers and otherwise default settings.
    pub fn with_threads(n: usize) -> Result<Self> {
        let config = Config::builder().num_threads(n).build()?;
        Self::new(&config)
    }

    pub(crate) fn submit(&self, job: Job) -> Result<()> {
        // count first so a concurrent shutdown cannot miss this job
        self.shared.pending.fetch_add(1, Ordering::SeqCst);

        if self.shared.shutdown.load(Ordering::SeqCst) {
            self.shared.pending.fetch_sub(1, Ordering::SeqCst);
            return Err(Error::PoolShutdown);
        }

        self.shared.submitted.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(job = %job.id, "job queued");
        self.shared.injector.push(job);

        let idx = self.next_wake.fetch_add(1, Ordering::Relaxed) % self.num_threads;
        self.unparkers[idx].unpark();

        Ok(())
    }

    /// Queue `f` for execution on some worker; returns immediately.
    pub fn execute<F>(&self, f: F) -> Result<TaskId>
    where
        F: FnOnce() + Send + 'static,
    {
        let job = Job::new(f);
        let id = job.id;
        self.submit(job)?;
        Ok(id)
    }

    /// Handler shared by raw jobs and task background computations.
    pub(crate) fn panic_handler(&self) -> Arc<PanicHandler> {
        self.shared.panic_handler.clone()
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Jobs queued or currently running.
    pub fn pending(&self) -> usize {
        self.shared.pending.load(Ordering::SeqCst)
    }

    pub fn is_shutdown(&self) -> bool {
        self.shared.shutdown.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            workers: self.num_threads,
            submitted: self.shared.submitted.load(Ordering::Relaxed),
            executed: self.shared.executed.load(Ordering::Relaxed),
            panicked: self.shared.panic_handler.panic_count(),
            pending: self.shared.pending.load(Ordering::SeqCst),
            active: self.shared.active.load(Ordering::SeqCst),
        }
    }

    /// Stop accepting work, let the workers finish everything already
    /// queued, then join them. Safe to call more than once.
    pub fn shutdown(&self) {
        let first = !self.shared.shutdown.swap(true, Ordering::SeqCst);
        if first {
            tracing::debug!(pending = self.pending(), "worker pool shutting down");
        }

        for unparker in &self.unparkers {
            unparker.unpark();
        }

        let current = thread::current().id();
        let mut workers = self.workers.lock();
        for worker in workers.iter_mut() {
            // a job dropping the last pool handle must not join its own thread
            let is_current = worker
                .thread
                .as_ref()
                .map_or(false, |t| t.thread().id() == current);
            if is_current {
                continue;
            }

            if let Some(thread) = worker.thread.take() {
                if thread.join().is_err() {
                    tracing::error!(worker = worker.id, "worker thread panicked");
                }
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("num_threads", &self.num_threads)
            .field("pending", &self.pending())
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}
