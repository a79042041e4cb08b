use crate::call::{CallHooks, QueuedCall};
use crate::models::{CallSnapshot, QueueError, QueueStats};
use crate::queue::waiter::{PendingAgent, Waiter};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;

/// Round-robin call distribution queue.
///
/// Calls are delivered first in, first out. Agents that find the queue empty
/// park in arrival order and each incoming call goes to the agent that has
/// been waiting longest. The hand-off happens under the queue lock, so the
/// agent woken for a call is the one that receives it.
///
/// ```
/// use acd_queue::{CallHooks, CallQueue, QueuedCall};
///
/// struct Caller(&'static str);
/// impl CallHooks for Caller {}
///
/// let queue = CallQueue::new();
/// queue.enqueue(QueuedCall::new(Caller("alice"))).unwrap();
/// assert_eq!(queue.next_call().unwrap().0, "alice");
/// ```
pub struct CallQueue<C> {
    state: Mutex<QueueState<C>>,
}

pub(crate) struct QueueState<C> {
    calls: VecDeque<QueuedCall<C>>,
    pub(crate) waiters: VecDeque<Waiter<C>>,
    next_waiter_id: u64,
    enqueued: u64,
    pub(crate) delivered: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Placement {
    Front,
    Back,
}

enum Pickup<'a, C: CallHooks> {
    Taken(QueuedCall<C>),
    Waiting(PendingAgent<'a, C>),
}

impl<C: CallHooks> QueueState<C> {
    /// Hands the call to the longest-waiting agent, or stores it.
    pub(crate) fn dispatch(&mut self, mut call: QueuedCall<C>, placement: Placement) {
        while let Some(waiter) = self.waiters.pop_front() {
            let call_id = call.id();
            match waiter.slot.send(call) {
                Ok(()) => {
                    self.delivered += 1;
                    log::debug!("call {} handed to agent {}", call_id, waiter.id);
                    return;
                }
                Err(returned) => call = returned,
            }
        }
        log::debug!("call {} queued at depth {}", call.id(), self.calls.len() + 1);
        match placement {
            Placement::Front => self.calls.push_front(call),
            Placement::Back => self.calls.push_back(call),
        }
    }
}

impl<C: CallHooks> CallQueue<C> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                calls: VecDeque::new(),
                waiters: VecDeque::new(),
                next_waiter_id: 0,
                enqueued: 0,
                delivered: 0,
            }),
        }
    }

    /// Holds the call and appends it to the tail, waking at most one agent.
    ///
    /// Never waits for an agent. A call that was already held or made ready
    /// is rejected and dropped.
    pub fn enqueue(&self, mut call: QueuedCall<C>) -> Result<(), QueueError> {
        call.hold()?;
        let mut state = self.lock();
        state.enqueued += 1;
        state.dispatch(call, Placement::Back);
        Ok(())
    }

    /// Blocks the current thread until a call is available and returns it.
    ///
    /// Tasks use [`next_call_async`](Self::next_call_async) instead.
    ///
    /// # Panics
    ///
    /// Panics when the queue is empty and the caller is a thread driving a
    /// tokio runtime, since parking it would stall the runtime.
    pub fn next_call(&self) -> Result<C, QueueError> {
        let call = loop {
            match self.pickup() {
                Pickup::Taken(call) => break call,
                Pickup::Waiting(agent) => {
                    if let Some(call) = agent.wait_blocking() {
                        break call;
                    }
                }
            }
        };
        Self::release(call)
    }

    /// Async form of [`next_call`](Self::next_call).
    ///
    /// Dropping the future gives up the agent's place. A call handed to it in
    /// the meantime goes back to the head of the queue, still held.
    pub async fn next_call_async(&self) -> Result<C, QueueError> {
        let call = loop {
            match self.pickup() {
                Pickup::Taken(call) => break call,
                Pickup::Waiting(agent) => {
                    if let Some(call) = agent.wait().await {
                        break call;
                    }
                }
            }
        };
        Self::release(call)
    }

    pub async fn next_call_timeout(&self, timeout: Duration) -> Result<C, QueueError> {
        match tokio::time::timeout(timeout, self.next_call_async()).await {
            Ok(result) => result,
            Err(_) => Err(QueueError::Timeout(timeout)),
        }
    }

    /// Takes the head call without waiting.
    pub fn try_next_call(&self) -> Option<Result<C, QueueError>> {
        let call = {
            let mut state = self.lock();
            let call = state.calls.pop_front()?;
            state.delivered += 1;
            call
        };
        Some(Self::release(call))
    }

    /// Number of agents currently parked in `next_call`.
    pub fn agents_waiting(&self) -> usize {
        self.lock().waiters.len()
    }

    pub fn len(&self) -> usize {
        self.lock().calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().calls.is_empty()
    }

    /// Queued, undelivered calls in delivery order.
    pub fn queue_snapshot(&self) -> Vec<CallSnapshot> {
        self.lock()
            .calls
            .iter()
            .map(|call| CallSnapshot {
                id: call.id(),
                state: call.state(),
                queued_for: call.waited(),
            })
            .collect()
    }

    pub fn stats(&self) -> QueueStats {
        let state = self.lock();
        QueueStats {
            enqueued: state.enqueued,
            delivered: state.delivered,
            queued: state.calls.len(),
            agents_waiting: state.waiters.len(),
        }
    }

    fn pickup(&self) -> Pickup<'_, C> {
        let mut state = self.lock();
        if let Some(call) = state.calls.pop_front() {
            state.delivered += 1;
            return Pickup::Taken(call);
        }
        let id = state.next_waiter_id;
        state.next_waiter_id += 1;
        let (slot, receiver) = oneshot::channel();
        state.waiters.push_back(Waiter { id, slot });
        log::trace!("agent {} waiting, {} in line", id, state.waiters.len());
        Pickup::Waiting(PendingAgent::new(self, id, receiver))
    }

    fn release(mut call: QueuedCall<C>) -> Result<C, QueueError> {
        call.make_ready()?;
        log::debug!("call {} ready after {:?}", call.id(), call.waited());
        call.into_call()
    }

    // No user code runs under the lock, a poisoned state is still consistent.
    pub(crate) fn lock(&self) -> MutexGuard<'_, QueueState<C>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C: CallHooks> Default for CallQueue<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: CallHooks> fmt::Debug for CallQueue<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.stats();
        f.debug_struct("CallQueue")
            .field("queued", &stats.queued)
            .field("agents_waiting", &stats.agents_waiting)
            .finish()
    }
}
