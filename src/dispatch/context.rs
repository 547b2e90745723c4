//! The capability a host provides so work can be resumed on its owner thread.

/// A callback to be run later on the owner context.
pub type Callback = Box<dyn FnOnce() + Send + 'static>;

/// Something that can run posted callbacks later, in the order they were
/// posted, on one owner execution context.
///
/// A UI toolkit's "run on main thread" primitive, an [`EventLoop`] handle or
/// a test harness queue all satisfy this. Implementations must not run the
/// callback inline from `schedule` unless the caller already is the owner
/// context.
///
/// [`EventLoop`]: super::EventLoop
pub trait OwnerContext: Send + Sync + 'static {
    fn schedule(&self, callback: Callback);
}

impl<F> OwnerContext for F
where
    F: Fn(Callback) + Send + Sync + 'static,
{
    fn schedule(&self, callback: Callback) {
        self(callback)
    }
}
