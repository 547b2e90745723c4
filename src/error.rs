use crate::task::{TaskId, TaskState};

pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error returned by a background computation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("worker pool not configured")]
    NotConfigured,

    #[error("task {id} already submitted (state: {state:?})")]
    AlreadySubmitted { id: TaskId, state: TaskState },

    #[error("worker pool is shut down")]
    PoolShutdown,

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),
}

impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }
}

/// Failure delivered to `Task::on_complete` in place of a result.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("background computation failed: {0}")]
    Failed(#[source] BoxError),

    #[error("background computation panicked: {0}")]
    Panicked(String),
}

impl TaskError {
    pub fn is_panic(&self) -> bool {
        matches!(self, TaskError::Panicked(_))
    }
}
