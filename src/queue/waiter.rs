use crate::call::{CallHooks, QueuedCall};
use crate::queue::round_robin::{CallQueue, Placement};
use tokio::sync::oneshot;

/// Slot an agent parks in while the queue is empty. Lives in the queue's
/// waiter list; the producer that pops it sends the call straight in.
pub(crate) struct Waiter<C> {
    pub(crate) id: u64,
    pub(crate) slot: oneshot::Sender<QueuedCall<C>>,
}

/// Agent side of a [`Waiter`].
///
/// Dropping it before a call arrives deregisters the agent. A call that was
/// already handed over but never picked up goes back to the head of the queue.
pub(crate) struct PendingAgent<'a, C: CallHooks> {
    queue: &'a CallQueue<C>,
    id: u64,
    slot: Option<oneshot::Receiver<QueuedCall<C>>>,
    finished: bool,
}

impl<'a, C: CallHooks> PendingAgent<'a, C> {
    pub(crate) fn new(
        queue: &'a CallQueue<C>,
        id: u64,
        slot: oneshot::Receiver<QueuedCall<C>>,
    ) -> Self {
        Self {
            queue,
            id,
            slot: Some(slot),
            finished: false,
        }
    }

    /// Parks the current thread. `None` means the slot closed without a call
    /// and the agent has to register again.
    pub(crate) fn wait_blocking(mut self) -> Option<QueuedCall<C>> {
        let received = self.slot.take().and_then(|slot| slot.blocking_recv().ok());
        self.finished = true;
        received
    }

    pub(crate) async fn wait(mut self) -> Option<QueuedCall<C>> {
        let received = match self.slot.as_mut() {
            Some(slot) => slot.await.ok(),
            None => None,
        };
        self.finished = true;
        received
    }
}

impl<C: CallHooks> Drop for PendingAgent<'_, C> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let mut state = self.queue.lock();
        if let Some(pos) = state.waiters.iter().position(|w| w.id == self.id) {
            state.waiters.remove(pos);
            log::trace!("agent {} stopped waiting", self.id);
            return;
        }
        // Popped by a producer under the lock we now hold, so the send is done.
        if let Some(Ok(call)) = self.slot.as_mut().map(|slot| slot.try_recv()) {
            log::warn!(
                "agent {} abandoned call {}, returning it to the head of the queue",
                self.id,
                call.id()
            );
            state.delivered -= 1;
            state.dispatch(call, Placement::Front);
        }
    }
}
