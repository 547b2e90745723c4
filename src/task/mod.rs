//! The user-facing task contract and its submit-once lifecycle.
//!
//! A [`Task`] describes a background computation plus the callbacks that
//! observe it. [`AsyncTask`] wraps one task instance, runs `before_start`
//! on the submitting thread, and schedules the computation on the
//! runtime's worker pool. Progress and the final [`Outcome`] come back
//! through the runtime's dispatch channel, on the owner context.

pub mod runner;
pub mod state;

pub use crate::executor::TaskId;
pub use runner::Progress;
pub use state::TaskState;

use crate::error::{BoxError, Error, Result, TaskError};
use crate::runtime::Runtime;
use runner::TaskRunner;
use state::StateCell;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Result delivered to [`Task::on_complete`].
pub type Outcome<T> = std::result::Result<T, TaskError>;

/// A unit of background work with owner-context callbacks.
///
/// `run_background` runs exactly once on a worker thread. `on_progress` and
/// `on_complete` run on the owner context, in the order they were posted;
/// `on_complete` runs exactly once, after every progress update of the same
/// task has been delivered.
pub trait Task: Send + Sync + 'static {
    type Params: Send + 'static;
    type Update: Send + 'static;
    type Output: Send + 'static;

    /// Called synchronously on the submitting context before the task is
    /// queued. Panics here are not caught.
    fn before_start(&self) {}

    fn run_background(
        &self,
        params: Self::Params,
        progress: &Progress<Self::Update>,
    ) -> std::result::Result<Self::Output, BoxError>;

    fn on_progress(&self, _update: Self::Update) {}

    /// Receives the returned value, or the failure if the background
    /// computation returned an error or panicked.
    fn on_complete(&self, _outcome: Outcome<Self::Output>) {}
}

/// Submit-once handle around a [`Task`].
///
/// A second `submit` on the same handle is rejected with
/// [`Error::AlreadySubmitted`]; create a new `AsyncTask` to run again.
pub struct AsyncTask<T: Task> {
    id: TaskId,
    task: Arc<T>,
    state: Arc<StateCell>,
    submitted: AtomicBool,
}

impl<T: Task> AsyncTask<T> {
    pub fn new(task: T) -> Self {
        Self::from_arc(Arc::new(task))
    }

    /// Wrap a task that is also shared elsewhere.
    pub fn from_arc(task: Arc<T>) -> Self {
        Self {
            id: TaskId::next(),
            task,
            state: Arc::new(StateCell::new()),
            submitted: AtomicBool::new(false),
        }
    }

    /// Run `before_start` here, then queue the background computation on
    /// the runtime's pool. Returns without waiting for it.
    ///
    /// If the pool is already shut down, nothing runs and the handle stays
    /// unsubmitted. Once `before_start` has run, the handle counts as
    /// submitted even if queueing then fails, so `before_start` runs at most
    /// once per handle.
    pub fn submit(&self, runtime: &Runtime, params: T::Params) -> Result<TaskId> {
        if self.submitted.swap(true, Ordering::AcqRel) {
            return Err(Error::AlreadySubmitted {
                id: self.id,
                state: self.state(),
            });
        }

        if runtime.pool().is_shutdown() {
            self.submitted.store(false, Ordering::Release);
            return Err(Error::PoolShutdown);
        }

        self.task.before_start();

        let runner = TaskRunner::new(
            self.id,
            self.task.clone(),
            self.state.clone(),
            runtime.channel().clone(),
            runtime.pool().panic_handler(),
            params,
        );

        if let Err(e) = runtime.schedule(self.id, move || runner.run()) {
            tracing::debug!(task = %self.id, error = %e, "task not queued after before_start");
            return Err(e);
        }

        tracing::debug!(task = %self.id, "task submitted");
        Ok(self.id)
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn state(&self) -> TaskState {
        self.state.get()
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted.load(Ordering::Acquire)
    }

    pub fn task(&self) -> &Arc<T> {
        &self.task
    }
}

impl<T: Task> fmt::Debug for AsyncTask<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncTask")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("submitted", &self.is_submitted())
            .finish()
    }
}
