use crate::call::CallHooks;
use crate::models::QueueError;
use crate::queue::CallQueue;
use crate::utils::gen_random_name;
use dashmap::DashMap;
use std::sync::Arc;

/// Named call queues, one per hunt group.
pub struct HuntGroups<C> {
    groups: DashMap<String, Arc<CallQueue<C>>>,
}

impl<C: CallHooks> HuntGroups<C> {
    pub fn new() -> Self {
        Self {
            groups: DashMap::new(),
        }
    }

    /// Returns the group's queue, creating it on first use. An empty name
    /// gets a generated one.
    pub fn declare(&self, name: &str) -> (String, Arc<CallQueue<C>>) {
        let mut name = name.to_string();
        if name.is_empty() {
            name = gen_random_name();
        }

        let queue = self
            .groups
            .entry(name.clone())
            .or_insert_with(|| {
                log::info!("hunt group {} declared", name);
                Arc::new(CallQueue::new())
            })
            .clone();
        (name, queue)
    }

    pub fn get(&self, name: &str) -> Result<Arc<CallQueue<C>>, QueueError> {
        self.groups
            .get(name)
            .map(|queue| Arc::clone(&queue))
            .ok_or_else(|| QueueError::HuntGroupNotFound(name.to_string()))
    }

    /// Unregisters the group. Holders of the returned queue keep working
    /// against it; calls still queued stay there.
    pub fn remove(&self, name: &str) -> Result<Arc<CallQueue<C>>, QueueError> {
        let (_, queue) = self
            .groups
            .remove(name)
            .ok_or_else(|| QueueError::HuntGroupNotFound(name.to_string()))?;
        if !queue.is_empty() {
            log::warn!("hunt group {} removed with {} calls queued", name, queue.len());
        }
        Ok(queue)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.groups.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl<C: CallHooks> Default for HuntGroups<C> {
    fn default() -> Self {
        Self::new()
    }
}
