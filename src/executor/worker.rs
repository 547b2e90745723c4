// worker thread loop
use super::job::Job;
use super::panic_handler::PanicHandler;
use crossbeam_deque::{Injector, Steal, Stealer, Worker as WorkerQueue};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

pub type WorkerId = usize;

/// State shared between the pool handle and every worker.
pub(crate) struct Shared {
    pub injector: Injector<Job>,
    pub stealers: Vec<Stealer<Job>>,
    pub shutdown: AtomicBool,
    // queued + running
    pub pending: AtomicUsize,
    pub active: AtomicUsize,
    pub submitted: AtomicU64,
    pub executed: AtomicU64,
    pub panic_handler: Arc<PanicHandler>,
}

impl Shared {
    pub fn new(stealers: Vec<Stealer<Job>>, panic_handler: Arc<PanicHandler>) -> Self {
        Self {
            injector: Injector::new(),
            stealers,
            shutdown: AtomicBool::new(false),
            pending: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            submitted: AtomicU64::new(0),
            executed: AtomicU64::new(0),
            panic_handler,
        }
    }

    fn drained(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst) && self.pending.load(Ordering::SeqCst) == 0
    }
}

pub(crate) struct Worker {
    pub id: WorkerId,
    pub local_queue: WorkerQueue<Job>,
}

impl Worker {
    pub fn new(id: WorkerId) -> Self {
        Self {
            id,
            local_queue: WorkerQueue::new_fifo(),
        }
    }

    // main loop, exits once shutdown is requested and nothing is left
    pub fn run(&self, shared: Arc<Shared>) {
        tracing::trace!(worker = self.id, "worker started");
        let mut backoff_cnt = 0;

        loop {
            if let Some(job) = self.find_job(&shared) {
                backoff_cnt = 0;
                self.execute_job(&shared, job);
                shared.pending.fetch_sub(1, Ordering::SeqCst);
            } else if shared.drained() {
                break;
            } else {
                self.backoff(&mut backoff_cnt);
            }
        }

        tracing::trace!(worker = self.id, "worker stopped");
    }

    fn find_job(&self, shared: &Shared) -> Option<Job> {
        if let Some(job) = self.local_queue.pop() {
            return Some(job);
        }

        loop {
            match shared.injector.steal_batch_and_pop(&self.local_queue) {
                Steal::Success(job) => return Some(job),
                Steal::Empty => break,
                Steal::Retry => continue,
            }
        }

        self.try_steal_from_workers(&shared.stealers)
    }

    fn try_steal_from_workers(&self, stealers: &[Stealer<Job>]) -> Option<Job> {
        let n = stealers.len();

        // start after our own slot so victims rotate
        for offset in 1..n {
            let idx = (self.id + offset) % n;

            loop {
                match stealers[idx].steal_batch_and_pop(&self.local_queue) {
                    Steal::Success(job) => {
                        tracing::trace!(worker = self.id, victim = idx, "stole job");
                        return Some(job);
                    }
                    Steal::Empty => break,
                    Steal::Retry => continue,
                }
            }
        }

        None
    }

    fn execute_job(&self, shared: &Shared, job: Job) {
        let id = job.id;
        let queued_for = job.enqueued_at.elapsed();
        let start = Instant::now();

        shared.active.fetch_add(1, Ordering::SeqCst);
        let result = shared.panic_handler.execute(|| job.execute());
        shared.active.fetch_sub(1, Ordering::SeqCst);
        shared.executed.fetch_add(1, Ordering::Relaxed);

        match result {
            Ok(()) => tracing::trace!(
                worker = self.id,
                job = %id,
                queued_us = queued_for.as_micros() as u64,
                run_us = start.elapsed().as_micros() as u64,
                "job finished"
            ),
            Err(info) => tracing::debug!(
                worker = self.id,
                job = %id,
                message = %info.message,
                "job panicked, worker continues"
            ),
        }
    }

    fn backoff(&self, count: &mut u32) {
        const MAX_SPINS: u32 = 10;
        const MAX_YIELDS: u32 = 20;

        *count += 1;

        if *count <= MAX_SPINS {
            let spins = (*count).min(6);
            for _ in 0..(1 << spins) {
                std::hint::spin_loop();
            }
        } else if *count <= MAX_YIELDS {
            thread::yield_now();
        } else {
            thread::park_timeout(Duration::from_millis(1));
        }
    }
}
