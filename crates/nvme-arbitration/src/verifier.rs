//! Arbitration verifier.
//!
//! Positions `1..=urgent_count` must be serviced by Urgent queues, where
//! `urgent_count` is the number of commands outstanding on Urgent queues.
//! After that prefix the strategies differ:
//!
//! - **Strict**: windows are laid down in the order `rank1, rank2, rank3,
//!   rank1, ...`, each spanning `weight + 1` positions. Every position must
//!   belong to its window's class. Classification stops once the cycle
//!   limit from [`cycle_limit`] is reached; later positions are counted as
//!   unclassified.
//! - **Relaxed**: each entry is tallied under its own class. Only an Urgent
//!   entry after the prefix is a mismatch.

use nvme_errors::ArbitrationError;
use nvme_queue::{
    ArbitrationTrace, ArbitrationWeights, CompletionEntry, PriorityClass, QueueRegistry,
};
use tracing::{debug, warn};

use crate::order::{PriorityOrder, cycle_limit, order_for};
use crate::result::{Mismatch, VerificationResult, VerificationStrategy};

/// Verify `trace` against the arbitration policy implied by `weights`.
///
/// The returned result carries `ReapStatus::Complete`; callers that captured
/// the trace themselves attach the real status with
/// [`VerificationResult::with_reap_status`].
///
/// # Errors
///
/// Returns `ArbitrationError::UnboundQueue` if a trace entry's queue has no
/// priority binding in `registry`.
pub fn verify_arbitration<R: QueueRegistry + ?Sized>(
    trace: &ArbitrationTrace,
    weights: &ArbitrationWeights,
    registry: &R,
    strategy: VerificationStrategy,
) -> Result<VerificationResult, ArbitrationError> {
    let classes = resolve_classes(trace, registry)?;
    let order = order_for(weights);
    let reaped = u32::try_from(trace.len()).unwrap_or(u32::MAX);
    let urgent_count = registry.outstanding_in_class(PriorityClass::Urgent);

    let mut result = VerificationResult::new(strategy, order, reaped);
    let mut positions = (1u32..).zip(trace.iter().zip(classes));

    for (position, (entry, class)) in positions.by_ref().take(prefix_len(urgent_count, trace)) {
        if class == PriorityClass::Urgent {
            result.record_match(PriorityClass::Urgent);
        } else {
            let window = Window {
                class: PriorityClass::Urgent,
                rank: 0,
                start: 1,
                end: urgent_count,
            };
            mismatch(&mut result, PriorityClass::Urgent, window, position, entry, class);
        }
    }

    match strategy {
        VerificationStrategy::Strict => {
            let limit = cycle_limit(registry, weights, &order);
            result.cycle_limit = limit;
            let mut window = Window::first(&order, weights, urgent_count.saturating_add(1));

            for (position, (entry, class)) in positions {
                if limit.is_some_and(|limit| result.completed_cycles >= limit) {
                    result.unclassified = result.unclassified.saturating_add(1);
                    continue;
                }
                if position > window.end {
                    window = window.next(&order, weights);
                }

                if class == window.class {
                    result.record_match(class);
                } else {
                    mismatch(&mut result, window.class, window, position, entry, class);
                }

                if position == window.end && window.rank == 2 {
                    result.completed_cycles = result.completed_cycles.saturating_add(1);
                }
            }
        }
        VerificationStrategy::Relaxed => {
            for (position, (entry, class)) in positions {
                if class == PriorityClass::Urgent {
                    let window = Window {
                        class: PriorityClass::Urgent,
                        rank: 0,
                        start: urgent_count.saturating_add(1),
                        end: reaped,
                    };
                    relaxed_urgent_mismatch(&mut result, window, position, entry);
                } else {
                    result.record_match(class);
                }
            }
        }
    }

    debug!(
        %strategy,
        %order,
        reaped,
        urgent_count,
        mismatches = result.total_mismatches(),
        unclassified = result.unclassified,
        cycles = result.completed_cycles,
        "arbitration trace verified"
    );
    Ok(result)
}

fn resolve_classes<R: QueueRegistry + ?Sized>(
    trace: &ArbitrationTrace,
    registry: &R,
) -> Result<Vec<PriorityClass>, ArbitrationError> {
    trace
        .iter()
        .map(|entry| {
            registry.queue_priority(entry.sq_id).ok_or_else(|| {
                warn!(queue_id = entry.sq_id, "trace entry from queue with no priority binding");
                ArbitrationError::unbound_queue(entry.sq_id)
            })
        })
        .collect()
}

fn prefix_len(urgent_count: u32, trace: &ArbitrationTrace) -> usize {
    usize::try_from(urgent_count)
        .unwrap_or(usize::MAX)
        .min(trace.len())
}

/// A run of positions expected to be serviced by one class.
#[derive(Debug, Clone, Copy)]
struct Window {
    class: PriorityClass,
    /// 0-based rank within the cycle
    rank: usize,
    start: u32,
    end: u32,
}

impl Window {
    fn first(order: &PriorityOrder, weights: &ArbitrationWeights, start: u32) -> Self {
        Self::at_rank(order, weights, 0, start)
    }

    fn at_rank(order: &PriorityOrder, weights: &ArbitrationWeights, rank: usize, start: u32) -> Self {
        let class = order.at(rank);
        let slots = weights.service_slots(class).max(1);
        Self {
            class,
            rank,
            start,
            end: start.saturating_add(slots - 1),
        }
    }

    fn next(&self, order: &PriorityOrder, weights: &ArbitrationWeights) -> Self {
        Self::at_rank(order, weights, (self.rank + 1) % 3, self.end.saturating_add(1))
    }
}

fn mismatch(
    result: &mut VerificationResult,
    counted_under: PriorityClass,
    window: Window,
    position: u32,
    entry: &CompletionEntry,
    actual_class: PriorityClass,
) {
    let record = Mismatch {
        position,
        window_start: window.start,
        window_end: window.end,
        expected: Some(window.class),
        actual_queue: entry.sq_id,
        actual_class,
    };
    warn!(
        position,
        window_start = window.start,
        window_end = window.end,
        expected = %window.class,
        actual_queue = entry.sq_id,
        actual_class = %actual_class,
        cmd_id = entry.command_id,
        "arbitration mismatch"
    );
    result.record_mismatch(counted_under, record);
}

fn relaxed_urgent_mismatch(
    result: &mut VerificationResult,
    window: Window,
    position: u32,
    entry: &CompletionEntry,
) {
    let record = Mismatch {
        position,
        window_start: window.start,
        window_end: window.end,
        expected: None,
        actual_queue: entry.sq_id,
        actual_class: PriorityClass::Urgent,
    };
    warn!(
        position,
        actual_queue = entry.sq_id,
        cmd_id = entry.command_id,
        "urgent completion after the urgent prefix"
    );
    result.record_mismatch(PriorityClass::Urgent, record);
}
