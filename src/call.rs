use crate::models::{CallState, QueueError};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

static NEXT_CALL_ID: AtomicU64 = AtomicU64::new(1);

/// Lifecycle hooks the queue fires on the wrapped call.
///
/// A telephony call would start hold music in `on_hold` and stop it in
/// `on_ready`. Both default to no-ops.
pub trait CallHooks: Send + 'static {
    fn on_hold(&mut self) {}
    fn on_ready(&mut self) {}
}

/// A call wrapped in the one-shot `New -> Held -> Ready` hand-off lifecycle.
pub struct QueuedCall<C> {
    id: u64,
    state: CallState,
    held_at: Option<Instant>,
    call: C,
}

impl<C: CallHooks> QueuedCall<C> {
    pub fn new(call: C) -> Self {
        Self {
            id: NEXT_CALL_ID.fetch_add(1, Ordering::Relaxed),
            state: CallState::New,
            held_at: None,
            call,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    pub fn call(&self) -> &C {
        &self.call
    }

    /// Time spent since the call was held, zero before that.
    pub fn waited(&self) -> Duration {
        self.held_at.map(|at| at.elapsed()).unwrap_or_default()
    }

    /// Puts the call on hold. Valid once, from `New`.
    pub fn hold(&mut self) -> Result<(), QueueError> {
        self.transition(CallState::New, CallState::Held)?;
        self.held_at = Some(Instant::now());
        self.call.on_hold();
        Ok(())
    }

    /// Marks the call as picked up by an agent. Valid once, from `Held`.
    pub fn make_ready(&mut self) -> Result<(), QueueError> {
        self.transition(CallState::Held, CallState::Ready)?;
        self.call.on_ready();
        Ok(())
    }

    /// Releases the wrapped call to its new owner.
    pub fn into_call(self) -> Result<C, QueueError> {
        if self.state != CallState::Ready {
            return Err(QueueError::NotReady {
                id: self.id,
                state: self.state,
            });
        }
        Ok(self.call)
    }

    fn transition(&mut self, from: CallState, to: CallState) -> Result<(), QueueError> {
        if self.state != from {
            log::warn!("call {} rejected {} -> {} while {}", self.id, from, to, self.state);
            return Err(QueueError::InvalidTransition {
                id: self.id,
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }
}

impl<C> fmt::Debug for QueuedCall<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueuedCall")
            .field("id", &self.id)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
