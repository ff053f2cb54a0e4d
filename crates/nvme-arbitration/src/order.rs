//! Priority order model.
//!
//! The weighted classes are ranked by descending weight. Ties go to the
//! class with the higher static priority (High over Medium over Low), which
//! falls out of a stable sort over the classes listed in static order.

use core::fmt;

use nvme_queue::{ArbitrationWeights, PriorityClass, QueueRegistry};
use serde::{Deserialize, Serialize};

/// Service order of the three weighted classes within one arbitration cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PriorityOrder {
    pub rank1: PriorityClass,
    pub rank2: PriorityClass,
    pub rank3: PriorityClass,
}

impl PriorityOrder {
    /// Ranks as an array, first serviced first.
    pub fn as_array(&self) -> [PriorityClass; 3] {
        [self.rank1, self.rank2, self.rank3]
    }

    /// Class at `rank` (0-based), wrapping every three.
    pub fn at(&self, rank: usize) -> PriorityClass {
        match rank % 3 {
            0 => self.rank1,
            1 => self.rank2,
            _ => self.rank3,
        }
    }
}

impl fmt::Display for PriorityOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} > {} > {}", self.rank1, self.rank2, self.rank3)
    }
}

/// Rank High, Medium and Low by descending weight, ties broken High > Medium > Low.
pub fn compute_order(high_weight: u8, medium_weight: u8, low_weight: u8) -> PriorityOrder {
    let mut ranked = [
        (PriorityClass::High, high_weight),
        (PriorityClass::Medium, medium_weight),
        (PriorityClass::Low, low_weight),
    ];
    // sort_by is stable
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    let [(rank1, _), (rank2, _), (rank3, _)] = ranked;
    PriorityOrder {
        rank1,
        rank2,
        rank3,
    }
}

/// [`compute_order`] over configured weights.
pub fn order_for(weights: &ArbitrationWeights) -> PriorityOrder {
    compute_order(
        weights.high_weight,
        weights.medium_weight,
        weights.low_weight,
    )
}

/// Smallest outstanding count among the queues bound to `order.rank1`.
///
/// `None` when no queue is bound to that class.
pub fn min_outstanding_in_top_class<R: QueueRegistry + ?Sized>(
    registry: &R,
    order: &PriorityOrder,
) -> Option<u32> {
    registry
        .queues_in_class(order.rank1)
        .into_iter()
        .map(|queue_id| registry.queue_outstanding_count(queue_id))
        .min()
}

/// Number of full cycles the strict verifier classifies.
///
/// `min_outstanding_in_top_class / weight(rank1)`, with a zero weight
/// dividing by its single service slot and a zero result raised to one.
/// `None` means no limit.
pub fn cycle_limit<R: QueueRegistry + ?Sized>(
    registry: &R,
    weights: &ArbitrationWeights,
    order: &PriorityOrder,
) -> Option<u32> {
    let min_outstanding = min_outstanding_in_top_class(registry, order)?;
    let divisor = match weights.weight(order.rank1).map(u32::from) {
        Some(0) | None => 1,
        Some(weight) => weight,
    };
    Some((min_outstanding / divisor).max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nvme_queue::StaticQueueRegistry;
    use nvme_queue::PriorityClass::{High, Low, Medium};

    #[test]
    fn test_strict_weights_keep_static_order() {
        assert_eq!(compute_order(9, 5, 1).as_array(), [High, Medium, Low]);
    }

    #[test]
    fn test_ties_prefer_static_priority() {
        assert_eq!(compute_order(5, 5, 0).as_array(), [High, Medium, Low]);
        assert_eq!(compute_order(0, 5, 5).as_array(), [Medium, Low, High]);
        assert_eq!(compute_order(3, 0, 3).as_array(), [High, Low, Medium]);
        assert_eq!(compute_order(7, 7, 7).as_array(), [High, Medium, Low]);
    }

    #[test]
    fn test_reversed_weights() {
        assert_eq!(compute_order(1, 5, 9).as_array(), [Low, Medium, High]);
    }

    #[test]
    fn test_min_outstanding_in_top_class() {
        let registry = StaticQueueRegistry::new()
            .with_queue(1, Medium, 40)
            .with_queue(2, Medium, 12)
            .with_queue(3, High, 4);
        let order = compute_order(0, 8, 2);
        assert_eq!(order.rank1, Medium);
        assert_eq!(min_outstanding_in_top_class(&registry, &order), Some(12));
        assert_eq!(
            min_outstanding_in_top_class(&registry, &compute_order(0, 0, 9)),
            None
        );
    }

    #[test]
    fn test_cycle_limit_rules() {
        let registry = StaticQueueRegistry::new().with_queue(4, High, 9);
        let weights = ArbitrationWeights::new(2, 1, 0);
        let order = order_for(&weights);
        assert_eq!(cycle_limit(&registry, &weights, &order), Some(4));

        let zero_weight = ArbitrationWeights::new(0, 0, 0);
        assert_eq!(
            cycle_limit(&registry, &zero_weight, &order_for(&zero_weight)),
            Some(9)
        );

        let starved = StaticQueueRegistry::new().with_queue(4, High, 1);
        assert_eq!(cycle_limit(&starved, &weights, &order), Some(1));

        let unbound = StaticQueueRegistry::new().with_queue(1, Low, 9);
        assert_eq!(cycle_limit(&unbound, &weights, &order), None);
    }

    #[test]
    fn test_order_wraps() {
        let order = compute_order(2, 1, 0);
        assert_eq!(order.at(3), High);
        assert_eq!(order.at(5), Low);
        assert_eq!(order.to_string(), "High > Medium > Low");
    }
}
