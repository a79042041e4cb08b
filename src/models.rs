use std::fmt;
use std::time::Duration;

/// Hand-off state of a [`QueuedCall`](crate::call::QueuedCall).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallState {
    /// Constructed by the producer, not yet accepted by a queue.
    New,
    /// Accepted by a queue and waiting for an agent.
    Held,
    /// Taken by an agent; the wrapped call has been released.
    Ready,
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallState::New => "new",
            CallState::Held => "held",
            CallState::Ready => "ready",
        };
        f.write_str(name)
    }
}

/// Read-only copy of one queued entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallSnapshot {
    pub id: u64,
    pub state: CallState,
    pub queued_for: Duration,
}

/// Counters read under the queue lock, so `queued == enqueued - delivered`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub enqueued: u64,
    pub delivered: u64,
    pub queued: usize,
    pub agents_waiting: usize,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("call {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: u64,
        from: CallState,
        to: CallState,
    },
    #[error("call {id} is {state}, not ready")]
    NotReady { id: u64, state: CallState },
    #[error("no call arrived within {0:?}")]
    Timeout(Duration),
    #[error("hunt group {0} not found")]
    HuntGroupNotFound(String),
}
