use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle of a submitted task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Not yet picked up by a worker.
    Created = 0,
    /// `run_background` is executing.
    Running = 1,
    /// The background computation returned; the result is being posted.
    Completing = 2,
    /// The result notification is posted. Terminal.
    Done = 3,
}

impl TaskState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => TaskState::Created,
            1 => TaskState::Running,
            2 => TaskState::Completing,
            _ => TaskState::Done,
        }
    }

    pub fn is_finished(&self) -> bool {
        *self == TaskState::Done
    }
}

#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub fn new() -> Self {
        StateCell(AtomicU8::new(TaskState::Created as u8))
    }

    pub fn get(&self) -> TaskState {
        TaskState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Move forward one step; states never go backwards.
    pub fn advance(&self, from: TaskState, to: TaskState) -> bool {
        debug_assert!((to as u8) == (from as u8) + 1);
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}
