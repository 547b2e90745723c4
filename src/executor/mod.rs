//! Background execution infrastructure.
//!
//! This module provides the worker pool that runs background computations,
//! the job representation it queues, and panic isolation for workers.

pub mod job;
pub mod panic_handler;
pub mod pool;
mod worker;

pub use job::TaskId;
pub use panic_handler::{PanicHandler, PanicInfo, PanicStrategy};
pub use pool::{PoolStats, WorkerPool};

pub(crate) use job::Job;
