pub use crate::config::{Config, ConfigBuilder};
pub use crate::dispatch::{DispatchChannel, EventLoop, LoopHandle, OwnerContext};
pub use crate::error::{BoxError, Error, Result, TaskError};
pub use crate::executor::{PanicStrategy, TaskId, WorkerPool};
pub use crate::runtime::{configure_worker_pool, Runtime};
pub use crate::task::{AsyncTask, Outcome, Progress, Task, TaskState};
