//! Delivery of task callbacks back onto the owner context.
//!
//! Worker threads post [`Notification`]s to a [`DispatchChannel`]. The
//! channel asks its [`OwnerContext`] to run a drain callback, and the drain
//! invokes the queued notifications one at a time, in posting order.

pub mod channel;
pub mod context;
pub mod event_loop;

pub use channel::{DispatchChannel, Notification, NotificationKind};
pub use context::{Callback, OwnerContext};
pub use event_loop::{EventLoop, LoopHandle};
