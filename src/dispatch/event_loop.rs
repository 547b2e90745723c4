//! A minimal owner-thread message loop.
//!
//! Hosts that already have a main loop implement [`OwnerContext`] on top of
//! it. Everyone else creates an [`EventLoop`] on the owner thread, hands its
//! [`LoopHandle`] to the dispatch channel, and pumps the loop.

use super::context::{Callback, OwnerContext};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::marker::PhantomData;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

/// Message loop owned by the thread that created it.
#[derive(Debug)]
pub struct EventLoop {
    tx: Sender<Callback>,
    rx: Receiver<Callback>,
    owner: ThreadId,
    // pin to the creating thread
    _not_send: PhantomData<*const ()>,
}

/// Cloneable, thread-safe handle that posts callbacks to an [`EventLoop`].
#[derive(Debug, Clone)]
pub struct LoopHandle {
    tx: Sender<Callback>,
    owner: ThreadId,
}

impl EventLoop {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self {
            tx,
            rx,
            owner: thread::current().id(),
            _not_send: PhantomData,
        }
    }

    pub fn handle(&self) -> LoopHandle {
        LoopHandle {
            tx: self.tx.clone(),
            owner: self.owner,
        }
    }

    pub fn owner(&self) -> ThreadId {
        self.owner
    }

    /// Callbacks posted but not yet run.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Run every callback queued so far. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Ok(callback) = self.rx.try_recv() {
            callback();
            ran += 1;
        }
        ran
    }

    /// Wait up to `timeout` for one callback and run it.
    pub fn run_once_timeout(&self, timeout: Duration) -> bool {
        match self.rx.recv_timeout(timeout) {
            Ok(callback) => {
                callback();
                true
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }

    /// Pump until `done` returns true or `timeout` elapses.
    pub fn run_until<F>(&self, mut done: F, timeout: Duration) -> bool
    where
        F: FnMut() -> bool,
    {
        let deadline = Instant::now() + timeout;

        loop {
            self.run_pending();
            if done() {
                return true;
            }

            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            self.run_once_timeout(deadline - now);
        }
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopHandle {
    pub fn owner(&self) -> ThreadId {
        self.owner
    }

    pub fn is_owner_thread(&self) -> bool {
        thread::current().id() == self.owner
    }
}

impl OwnerContext for LoopHandle {
    fn schedule(&self, callback: Callback) {
        // the loop keeps its own sender, so this only fails once it is gone
        if self.tx.send(callback).is_err() {
            tracing::warn!("event loop dropped, callback discarded");
        }
    }
}
