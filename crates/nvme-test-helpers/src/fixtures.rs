//! Weighted round robin trace fixtures.
//!
//! Fixtures use one submission queue per class:
//!
//! | Class  | Queue |
//! |--------|-------|
//! | Low    | 1     |
//! | Medium | 2     |
//! | Urgent | 3     |
//! | High   | 4     |

use std::collections::BTreeMap;

use nvme_queue::{
    ArbitrationTrace, ArbitrationWeights, CompletionEntry, PriorityClass, QueueId,
    StaticQueueRegistry,
};

/// Low priority fixture queue.
pub const LOW_QUEUE: QueueId = 1;
/// Medium priority fixture queue.
pub const MEDIUM_QUEUE: QueueId = 2;
/// Urgent priority fixture queue.
pub const URGENT_QUEUE: QueueId = 3;
/// High priority fixture queue.
pub const HIGH_QUEUE: QueueId = 4;
/// Highest fixture queue id.
pub const FIXTURE_QUEUE_COUNT: u16 = 4;

/// Fixture queue bound to `class`.
pub fn queue_for(class: PriorityClass) -> QueueId {
    match class {
        PriorityClass::Urgent => URGENT_QUEUE,
        PriorityClass::High => HIGH_QUEUE,
        PriorityClass::Medium => MEDIUM_QUEUE,
        PriorityClass::Low => LOW_QUEUE,
    }
}

/// A trace with the weights and registry that make it correct.
#[derive(Debug, Clone)]
pub struct WrrTraceFixture {
    pub weights: ArbitrationWeights,
    pub registry: StaticQueueRegistry,
    pub trace: ArbitrationTrace,
}

impl WrrTraceFixture {
    /// Twenty entries: four Urgent, then weights `(2, 1, 0)` in windows of 3, 2 and 1.
    pub fn standard() -> Self {
        WrrTraceBuilder::new(ArbitrationWeights::new(2, 1, 0))
            .urgent(4)
            .weighted(16)
            .build()
    }

    /// Class of the entry at 1-based `position`.
    pub fn class_at(&self, position: u32) -> Option<PriorityClass> {
        let index = usize::try_from(position.checked_sub(1)?).ok()?;
        let entry = self.trace.entries().get(index)?;
        PriorityClass::ALL
            .into_iter()
            .find(|&class| queue_for(class) == entry.sq_id)
    }

    /// Copy of the trace with the entry at 1-based `position` moved to `class`'s queue.
    pub fn flipped(&self, position: u32, class: PriorityClass) -> ArbitrationTrace {
        self.trace
            .positions()
            .map(|(pos, entry)| {
                if pos == position {
                    CompletionEntry {
                        sq_id: queue_for(class),
                        ..*entry
                    }
                } else {
                    *entry
                }
            })
            .collect()
    }

    /// Positions after the Urgent prefix.
    pub fn weighted_positions(&self) -> impl Iterator<Item = u32> + '_ {
        self.trace
            .positions()
            .filter(|(_, entry)| entry.sq_id != URGENT_QUEUE)
            .map(|(pos, _)| pos)
    }
}

/// Builds a trace in the order a conforming controller would complete it.
#[derive(Debug, Clone)]
pub struct WrrTraceBuilder {
    weights: ArbitrationWeights,
    ranking: [PriorityClass; 3],
    urgent: u32,
    weighted: u32,
    outstanding: BTreeMap<QueueId, u32>,
}

impl WrrTraceBuilder {
    /// Start a trace for `weights`, ranked High, Medium, Low.
    pub fn new(weights: ArbitrationWeights) -> Self {
        Self {
            weights,
            ranking: PriorityClass::WEIGHTED,
            urgent: 0,
            weighted: 0,
            outstanding: BTreeMap::new(),
        }
    }

    /// Service order of the weighted classes.
    #[must_use]
    pub fn ranked(mut self, ranking: [PriorityClass; 3]) -> Self {
        self.ranking = ranking;
        self
    }

    /// Number of leading Urgent completions.
    #[must_use]
    pub fn urgent(mut self, count: u32) -> Self {
        self.urgent = count;
        self
    }

    /// Number of weighted completions after the Urgent prefix.
    #[must_use]
    pub fn weighted(mut self, count: u32) -> Self {
        self.weighted = count;
        self
    }

    /// Registry outstanding count for `class`'s queue instead of its trace count.
    #[must_use]
    pub fn outstanding(mut self, class: PriorityClass, count: u32) -> Self {
        self.outstanding.insert(queue_for(class), count);
        self
    }

    pub fn build(self) -> WrrTraceFixture {
        let mut trace = ArbitrationTrace::new();
        let mut next_cid: BTreeMap<QueueId, u16> = BTreeMap::new();
        let mut emit = |trace: &mut ArbitrationTrace, class: PriorityClass| {
            let queue_id = queue_for(class);
            let cid = next_cid.entry(queue_id).or_insert(0);
            trace.push(CompletionEntry::success(queue_id, *cid));
            *cid = cid.wrapping_add(1);
        };

        for _ in 0..self.urgent {
            emit(&mut trace, PriorityClass::Urgent);
        }

        let mut remaining = self.weighted;
        if self.weights.cycle_length() > 0 {
            'cycles: loop {
                for class in self.ranking {
                    for _ in 0..self.weights.service_slots(class) {
                        if remaining == 0 {
                            break 'cycles;
                        }
                        emit(&mut trace, class);
                        remaining -= 1;
                    }
                }
            }
        }

        let mut registry = StaticQueueRegistry::new();
        for class in PriorityClass::ALL {
            let queue_id = queue_for(class);
            let in_trace = u32::try_from(trace.count_for_queue(queue_id)).unwrap_or(u32::MAX);
            let outstanding = self.outstanding.get(&queue_id).copied().unwrap_or(in_trace);
            registry.insert(queue_id, class, outstanding);
        }

        WrrTraceFixture {
            weights: self.weights,
            registry,
            trace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nvme_queue::QueueRegistry;

    #[test]
    fn test_standard_layout() {
        let fixture = WrrTraceFixture::standard();
        let queues: Vec<QueueId> = fixture.trace.iter().map(|e| e.sq_id).collect();
        assert_eq!(
            queues,
            vec![3, 3, 3, 3, 4, 4, 4, 2, 2, 1, 4, 4, 4, 2, 2, 1, 4, 4, 4, 2]
        );
        assert_eq!(fixture.registry.queue_outstanding_count(HIGH_QUEUE), 9);
        assert_eq!(fixture.registry.outstanding_in_class(PriorityClass::Urgent), 4);
    }

    #[test]
    fn test_flipped_changes_one_position() {
        let fixture = WrrTraceFixture::standard();
        let flipped = fixture.flipped(5, PriorityClass::Low);
        let changed = fixture
            .trace
            .iter()
            .zip(flipped.iter())
            .filter(|(a, b)| a.sq_id != b.sq_id)
            .count();
        assert_eq!(changed, 1);
        assert_eq!(fixture.class_at(5), Some(PriorityClass::High));
    }

    #[test]
    fn test_outstanding_override() {
        let fixture = WrrTraceBuilder::new(ArbitrationWeights::new(0, 0, 0))
            .weighted(3)
            .outstanding(PriorityClass::High, 1)
            .build();
        assert_eq!(fixture.registry.queue_outstanding_count(HIGH_QUEUE), 1);
        assert_eq!(fixture.trace.len(), 3);
    }
}
