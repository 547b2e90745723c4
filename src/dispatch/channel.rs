//! Single-consumer notification channel bound to one owner context.

use super::context::OwnerContext;
use crate::executor::TaskId;
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// What a notification carries to its task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Progress,
    Complete,
}

/// A progress update or final result addressed to one task.
///
/// The payload and the target task are captured in the delivery closure,
/// which runs on the owner context.
pub struct Notification {
    task: TaskId,
    kind: NotificationKind,
    deliver: Box<dyn FnOnce() + Send + 'static>,
}

impl Notification {
    pub fn new<F>(task: TaskId, kind: NotificationKind, deliver: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            task,
            kind,
            deliver: Box::new(deliver),
        }
    }

    pub fn task(&self) -> TaskId {
        self.task
    }

    pub fn kind(&self) -> NotificationKind {
        self.kind
    }

    fn deliver(self) {
        (self.deliver)()
    }
}

impl fmt::Debug for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notification")
            .field("task", &self.task)
            .field("kind", &self.kind)
            .finish()
    }
}

struct Inner {
    tx: Sender<Notification>,
    rx: Receiver<Notification>,
    context: Box<dyn OwnerContext>,
    // a drain callback is queued on the owner context
    scheduled: Mutex<bool>,
    draining: Mutex<()>,
    posted: AtomicU64,
    delivered: AtomicU64,
}

impl Inner {
    // runs on the owner context
    fn drain(&self) {
        let Some(_guard) = self.draining.try_lock() else {
            // reentered from a callback; the outer drain picks everything up
            *self.scheduled.lock() = false;
            return;
        };
        *self.scheduled.lock() = false;

        while let Ok(notification) = self.rx.try_recv() {
            tracing::trace!(
                task = %notification.task,
                kind = ?notification.kind,
                "delivering notification"
            );
            notification.deliver();
            self.delivered.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Delivers notifications, strictly in posting order, on one owner context.
///
/// `post` is callable from any thread and never blocks. The queue is
/// unbounded: if the owner context never runs its pending callbacks,
/// notifications accumulate and are never dropped. Clones share the same
/// queue, so one channel gives a single global order across every task
/// that posts to it.
#[derive(Clone)]
pub struct DispatchChannel {
    inner: Arc<Inner>,
}

impl DispatchChannel {
    pub fn new<C: OwnerContext>(context: C) -> Self {
        let (tx, rx) = unbounded();
        Self {
            inner: Arc::new(Inner {
                tx,
                rx,
                context: Box::new(context),
                scheduled: Mutex::new(false),
                draining: Mutex::new(()),
                posted: AtomicU64::new(0),
                delivered: AtomicU64::new(0),
            }),
        }
    }

    pub fn post(&self, notification: Notification) {
        tracing::trace!(
            task = %notification.task,
            kind = ?notification.kind,
            "posting notification"
        );

        // inner owns the receiver, so the send cannot fail
        let _ = self.inner.tx.send(notification);
        self.inner.posted.fetch_add(1, Ordering::Relaxed);

        let needs_drain = {
            let mut scheduled = self.inner.scheduled.lock();
            !std::mem::replace(&mut *scheduled, true)
        };

        if needs_drain {
            let inner = self.inner.clone();
            self.inner.context.schedule(Box::new(move || inner.drain()));
        }
    }

    /// Posted but not yet delivered.
    pub fn pending(&self) -> usize {
        self.inner.rx.len()
    }

    pub fn posted(&self) -> u64 {
        self.inner.posted.load(Ordering::Relaxed)
    }

    pub fn delivered(&self) -> u64 {
        self.inner.delivered.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for DispatchChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchChannel")
            .field("pending", &self.pending())
            .field("delivered", &self.delivered())
            .finish()
    }
}
