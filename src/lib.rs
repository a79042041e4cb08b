//! Round-robin call distribution for an ACD.
//!
//! Producers wrap incoming calls in a [`QueuedCall`] and [`CallQueue::enqueue`]
//! them; agents take them out with [`CallQueue::next_call`] (threads) or
//! [`CallQueue::next_call_async`] (tasks), blocking while the queue is empty.

pub mod call;
pub mod models;
pub mod queue;
pub mod registry;
mod utils;

pub use call::{CallHooks, QueuedCall};
pub use models::{CallSnapshot, CallState, QueueError, QueueStats};
pub use queue::CallQueue;
pub use registry::HuntGroups;
