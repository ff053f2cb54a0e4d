//! Queue registry.
//!
//! The registry answers two questions for the verifier: which priority
//! class a submission queue was created with, and how many commands are
//! outstanding on it at capture time.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{PriorityClass, QueueId};

/// Lookup of queue priority bindings and outstanding command counts.
pub trait QueueRegistry {
    /// Priority class `queue_id` was created with, `None` if unbound.
    fn queue_priority(&self, queue_id: QueueId) -> Option<PriorityClass>;

    /// Commands submitted to `queue_id` whose completions have not been reaped.
    fn queue_outstanding_count(&self, queue_id: QueueId) -> u32;

    /// Every queue id known to the registry, ascending.
    fn queue_ids(&self) -> Vec<QueueId>;

    /// Queue ids bound to `class`, ascending.
    fn queues_in_class(&self, class: PriorityClass) -> Vec<QueueId> {
        self.queue_ids()
            .into_iter()
            .filter(|&id| self.queue_priority(id) == Some(class))
            .collect()
    }

    /// Sum of outstanding counts over the queues bound to `class`.
    fn outstanding_in_class(&self, class: PriorityClass) -> u32 {
        self.queues_in_class(class)
            .into_iter()
            .map(|id| self.queue_outstanding_count(id))
            .fold(0u32, u32::saturating_add)
    }

    /// Sum of outstanding counts over every known queue.
    fn total_outstanding(&self) -> u32 {
        self.queue_ids()
            .into_iter()
            .map(|id| self.queue_outstanding_count(id))
            .fold(0u32, u32::saturating_add)
    }
}

impl<T: QueueRegistry + ?Sized> QueueRegistry for &T {
    fn queue_priority(&self, queue_id: QueueId) -> Option<PriorityClass> {
        (**self).queue_priority(queue_id)
    }

    fn queue_outstanding_count(&self, queue_id: QueueId) -> u32 {
        (**self).queue_outstanding_count(queue_id)
    }

    fn queue_ids(&self) -> Vec<QueueId> {
        (**self).queue_ids()
    }
}

/// Priority and outstanding count of one submission queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueBinding {
    /// Priority class the queue was created with
    pub priority: PriorityClass,
    /// Outstanding commands
    pub outstanding: u32,
}

/// In-memory registry populated up front.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticQueueRegistry {
    bindings: BTreeMap<QueueId, QueueBinding>,
}

impl StaticQueueRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`StaticQueueRegistry::insert`].
    #[must_use]
    pub fn with_queue(mut self, queue_id: QueueId, priority: PriorityClass, outstanding: u32) -> Self {
        self.insert(queue_id, priority, outstanding);
        self
    }

    /// Bind `queue_id`, replacing any earlier binding.
    pub fn insert(&mut self, queue_id: QueueId, priority: PriorityClass, outstanding: u32) {
        self.bindings.insert(
            queue_id,
            QueueBinding {
                priority,
                outstanding,
            },
        );
    }

    /// Update the outstanding count of a bound queue. Returns false if unbound.
    pub fn set_outstanding(&mut self, queue_id: QueueId, outstanding: u32) -> bool {
        match self.bindings.get_mut(&queue_id) {
            Some(binding) => {
                binding.outstanding = outstanding;
                true
            }
            None => false,
        }
    }

    /// Remove a binding.
    pub fn remove(&mut self, queue_id: QueueId) -> Option<QueueBinding> {
        self.bindings.remove(&queue_id)
    }

    /// Binding of `queue_id`.
    pub fn binding(&self, queue_id: QueueId) -> Option<&QueueBinding> {
        self.bindings.get(&queue_id)
    }

    /// Number of bound queues.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// True when no queue is bound.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl QueueRegistry for StaticQueueRegistry {
    fn queue_priority(&self, queue_id: QueueId) -> Option<PriorityClass> {
        self.bindings.get(&queue_id).map(|b| b.priority)
    }

    fn queue_outstanding_count(&self, queue_id: QueueId) -> u32 {
        self.bindings.get(&queue_id).map_or(0, |b| b.outstanding)
    }

    fn queue_ids(&self) -> Vec<QueueId> {
        self.bindings.keys().copied().collect()
    }
}

impl FromIterator<(QueueId, PriorityClass, u32)> for StaticQueueRegistry {
    fn from_iter<I: IntoIterator<Item = (QueueId, PriorityClass, u32)>>(iter: I) -> Self {
        let mut registry = Self::new();
        for (queue_id, priority, outstanding) in iter {
            registry.insert(queue_id, priority, outstanding);
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StaticQueueRegistry {
        StaticQueueRegistry::new()
            .with_queue(1, PriorityClass::Low, 5)
            .with_queue(2, PriorityClass::Medium, 5)
            .with_queue(3, PriorityClass::Urgent, 4)
            .with_queue(4, PriorityClass::High, 6)
            .with_queue(5, PriorityClass::Urgent, 2)
    }

    #[test]
    fn test_lookup() {
        let registry = sample();
        assert_eq!(registry.queue_priority(4), Some(PriorityClass::High));
        assert_eq!(registry.queue_priority(9), None);
        assert_eq!(registry.queue_outstanding_count(2), 5);
        assert_eq!(registry.queue_outstanding_count(9), 0);
        assert_eq!(registry.queue_ids(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_class_aggregates() {
        let registry = sample();
        assert_eq!(registry.queues_in_class(PriorityClass::Urgent), vec![3, 5]);
        assert_eq!(registry.outstanding_in_class(PriorityClass::Urgent), 6);
        assert_eq!(registry.outstanding_in_class(PriorityClass::High), 6);
        assert_eq!(registry.total_outstanding(), 22);
    }

    #[test]
    fn test_set_outstanding() {
        let mut registry = sample();
        assert!(registry.set_outstanding(1, 0));
        assert!(!registry.set_outstanding(42, 1));
        assert_eq!(registry.queue_outstanding_count(1), 0);
        assert_eq!(registry.remove(1).map(|b| b.priority), Some(PriorityClass::Low));
        assert_eq!(registry.len(), 4);
    }
}
