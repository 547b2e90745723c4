//! handoff - background tasks with ordered delivery on an owner thread
//!
//! Submit a [`Task`] from the thread that owns your state; its background
//! computation runs on a shared [`WorkerPool`], and its progress updates and
//! final result come back through a [`DispatchChannel`] as callbacks on that
//! same owner thread, in the order they were posted.
//!
//! # Quick Start
//!
//! ```no_run
//! use handoff_rs::prelude::*;
//!
//! struct Double;
//!
//! impl Task for Double {
//!     type Params = u32;
//!     type Update = u32;
//!     type Output = u32;
//!
//!     fn run_background(&self, n: u32, progress: &Progress<u32>) -> std::result::Result<u32, BoxError> {
//!         progress.report(50);
//!         Ok(n * 2)
//!     }
//!
//!     fn on_complete(&self, outcome: Outcome<u32>) {
//!         println!("done: {:?}", outcome);
//!     }
//! }
//!
//! let event_loop = EventLoop::new();
//! let config = Config::builder().num_threads(4).build().unwrap();
//! let runtime = Runtime::new(&config, event_loop.handle()).unwrap();
//!
//! let task = runtime.spawn(Double, 21).unwrap();
//! event_loop.run_until(|| task.state().is_finished() && event_loop.pending() == 0,
//!     std::time::Duration::from_secs(1));
//! ```
//!
//! # Guarantees
//!
//! - `run_background` runs exactly once, on a worker thread.
//! - `on_progress`/`on_complete` run on the owner context, in posting order
//!   across every task that shares a channel.
//! - `on_complete` runs exactly once, after all of that task's progress.
//! - Errors and panics in the background computation arrive as
//!   `Err(TaskError)` in `on_complete`; workers survive them.

#![warn(missing_debug_implementations)]

pub mod config;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod prelude;
pub mod runtime;
pub mod task;

pub use config::{Config, ConfigBuilder};
pub use dispatch::{DispatchChannel, EventLoop, LoopHandle, OwnerContext};
pub use error::{BoxError, Error, Result, TaskError};
pub use executor::{PanicStrategy, PoolStats, TaskId, WorkerPool};
pub use runtime::{
    configure_worker_pool, configure_worker_pool_with, global_pool, shutdown_worker_pool, Runtime,
};
pub use task::{AsyncTask, Outcome, Progress, Task, TaskState};
