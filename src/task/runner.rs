//! Runs one task's background computation and posts its callbacks.

use super::state::{StateCell, TaskState};
use super::{Outcome, Task};
use crate::dispatch::{DispatchChannel, Notification, NotificationKind};
use crate::error::TaskError;
use crate::executor::{PanicHandler, TaskId};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Progress reporter handed to `Task::run_background`.
///
/// Each `report` posts a notification that will invoke `on_progress` on
/// the owner context. It only lives for the duration of the background
/// computation, so no update can follow the final result.
pub struct Progress<U> {
    task: TaskId,
    channel: DispatchChannel,
    target: Arc<dyn Fn(U) + Send + Sync>,
    reported: AtomicU64,
}

impl<U: Send + 'static> Progress<U> {
    fn new(task: TaskId, channel: DispatchChannel, target: Arc<dyn Fn(U) + Send + Sync>) -> Self {
        Self {
            task,
            channel,
            target,
            reported: AtomicU64::new(0),
        }
    }

    /// Post `update` to the owner context. Does not wait for delivery.
    pub fn report(&self, update: U) {
        let target = self.target.clone();
        self.reported.fetch_add(1, Ordering::Relaxed);
        self.channel.post(Notification::new(
            self.task,
            NotificationKind::Progress,
            move || target(update),
        ));
    }

    pub fn task_id(&self) -> TaskId {
        self.task
    }

    /// Updates reported so far.
    pub fn reported(&self) -> u64 {
        self.reported.load(Ordering::Relaxed)
    }
}

impl<U> fmt::Debug for Progress<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Progress")
            .field("task", &self.task)
            .field("reported", &self.reported.load(Ordering::Relaxed))
            .finish()
    }
}

pub(crate) struct TaskRunner<T: Task> {
    id: TaskId,
    task: Arc<T>,
    state: Arc<StateCell>,
    channel: DispatchChannel,
    panic_handler: Arc<PanicHandler>,
    params: T::Params,
}

impl<T: Task> TaskRunner<T> {
    pub fn new(
        id: TaskId,
        task: Arc<T>,
        state: Arc<StateCell>,
        channel: DispatchChannel,
        panic_handler: Arc<PanicHandler>,
        params: T::Params,
    ) -> Self {
        Self {
            id,
            task,
            state,
            channel,
            panic_handler,
            params,
        }
    }

    // worker thread
    pub fn run(self) {
        let TaskRunner {
            id,
            task,
            state,
            channel,
            panic_handler,
            params,
        } = self;

        state.advance(TaskState::Created, TaskState::Running);
        tracing::debug!(task = %id, "background computation started");

        let target = {
            let task = task.clone();
            Arc::new(move |update: T::Update| task.on_progress(update))
        };
        let progress = Progress::new(id, channel.clone(), target);

        // panics follow the pool's PanicStrategy, same as raw jobs
        let result = panic_handler.execute(|| task.run_background(params, &progress));

        let outcome: Outcome<T::Output> = match result {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => {
                tracing::debug!(task = %id, error = %e, "background computation failed");
                Err(TaskError::Failed(e))
            }
            Err(info) => {
                tracing::warn!(task = %id, message = %info.message, "background computation panicked");
                Err(TaskError::Panicked(info.message))
            }
        };

        state.advance(TaskState::Running, TaskState::Completing);
        let reported = progress.reported();
        drop(progress);

        // Done only once the result is queued; delivery may overtake the
        // worker, so whichever side gets there first advances the state
        let delivered_state = state.clone();
        channel.post(Notification::new(id, NotificationKind::Complete, move || {
            delivered_state.advance(TaskState::Completing, TaskState::Done);
            task.on_complete(outcome)
        }));
        state.advance(TaskState::Completing, TaskState::Done);

        tracing::debug!(task = %id, progress_updates = reported, "result posted");
    }
}
