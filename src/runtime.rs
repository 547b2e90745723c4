//! Composition root tying one worker pool to one dispatch channel, plus an
//! optional process-wide pool for hosts that want a single shared one.

use crate::config::Config;
use crate::dispatch::{DispatchChannel, OwnerContext};
use crate::error::{Error, Result};
use crate::executor::{Job, PoolStats, TaskId, WorkerPool};
use crate::task::{AsyncTask, Task};
use parking_lot::RwLock;
use std::sync::Arc;

/// One worker pool plus one delivery channel.
///
/// Tasks submitted through the same runtime have their callbacks delivered
/// in a single global order on the channel's owner context. Cloning is
/// cheap and shares both halves.
#[derive(Debug, Clone)]
pub struct Runtime {
    pool: Arc<WorkerPool>,
    channel: DispatchChannel,
}

impl Runtime {
    pub fn new<C: OwnerContext>(config: &Config, context: C) -> Result<Self> {
        let pool = WorkerPool::new(config)?;
        Ok(Self::from_parts(Arc::new(pool), DispatchChannel::new(context)))
    }

    pub fn from_parts(pool: Arc<WorkerPool>, channel: DispatchChannel) -> Self {
        Self { pool, channel }
    }

    /// Runtime on top of the process-wide pool.
    pub fn from_global<C: OwnerContext>(context: C) -> Result<Self> {
        let pool = global_pool()?;
        Ok(Self::from_parts(pool, DispatchChannel::new(context)))
    }

    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    pub fn channel(&self) -> &DispatchChannel {
        &self.channel
    }

    /// Wrap `task` and submit it in one step.
    pub fn spawn<T: Task>(&self, task: T, params: T::Params) -> Result<AsyncTask<T>> {
        let task = AsyncTask::new(task);
        task.submit(self, params)?;
        Ok(task)
    }

    /// Run a plain procedure on the pool, with no callbacks.
    pub fn execute<F>(&self, f: F) -> Result<TaskId>
    where
        F: FnOnce() + Send + 'static,
    {
        self.pool.execute(f)
    }

    pub(crate) fn schedule<F>(&self, id: TaskId, f: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.pool.submit(Job::with_id(id, f))
    }

    pub fn stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Drain and stop the pool. Notifications already posted stay queued
    /// on the channel until the owner context runs them.
    pub fn shutdown(&self) {
        self.pool.shutdown();
    }
}

// Process-wide pool
static GLOBAL_POOL: RwLock<Option<Arc<WorkerPool>>> = RwLock::new(None);

/// Create or replace the process-wide pool with `count` workers.
///
/// Configure once at startup. Replacing a pool does not stop it: work
/// already queued there still runs to completion, and the old pool shuts
/// down once its last [`Runtime`] is dropped. Only new runtimes see the
/// new pool.
pub fn configure_worker_pool(count: usize) -> Result<()> {
    let config = Config::builder().num_threads(count).build()?;
    configure_worker_pool_with(&config)
}

pub fn configure_worker_pool_with(config: &Config) -> Result<()> {
    let pool = Arc::new(WorkerPool::new(config)?);
    let previous = GLOBAL_POOL.write().replace(pool);

    if previous.is_some() {
        tracing::warn!(
            workers = config.worker_threads(),
            "process-wide worker pool replaced"
        );
    }

    Ok(())
}

pub fn global_pool() -> Result<Arc<WorkerPool>> {
    GLOBAL_POOL.read().as_ref().cloned().ok_or(Error::NotConfigured)
}

/// Remove the process-wide pool. It drains once its last user lets go.
pub fn shutdown_worker_pool() {
    let previous = GLOBAL_POOL.write().take();
    drop(previous);
}
