//! End-to-end arbitration checks over fixture traces and a simulated device.

use nvme_arbitration::prelude::*;
use nvme_errors::{ConfigError, ConformanceError, QueueError};
use nvme_queue::CompletionEntry;
use nvme_test_helpers::prelude::*;

fn verify(
    fixture: &WrrTraceFixture,
    trace: &ArbitrationTrace,
    strategy: VerificationStrategy,
) -> VerificationResult {
    must(verify_arbitration(
        trace,
        &fixture.weights,
        &fixture.registry,
        strategy,
    ))
}

fn assert_accounted(result: &VerificationResult) {
    assert_eq!(
        result.classified() + result.unclassified,
        result.reaped,
        "every reaped entry is classified or unclassified"
    );
}

#[test]
fn test_strict_reference_trace_has_no_mismatches() {
    init_test_tracing();
    let fixture = WrrTraceFixture::standard();
    let result = verify(&fixture, &fixture.trace, VerificationStrategy::Strict);

    assert_eq!(result.total_mismatches(), 0);
    assert_eq!(result.matched(PriorityClass::Urgent), 4);
    assert_eq!(result.matched(PriorityClass::High), 9);
    assert_eq!(result.matched(PriorityClass::Medium), 5);
    assert_eq!(result.matched(PriorityClass::Low), 2);
    assert_eq!(result.unclassified, 0);
    assert_eq!(result.completed_cycles, 2);
    assert_eq!(result.cycle_limit, Some(4));
    assert!(result.passed());
    assert_accounted(&result);
}

#[test]
fn test_strict_single_flip_yields_one_mismatch() {
    let fixture = WrrTraceFixture::standard();
    let baseline = verify(&fixture, &fixture.trace, VerificationStrategy::Strict);

    for position in fixture.weighted_positions().collect::<Vec<u32>>() {
        let original = must_some(fixture.class_at(position), "position in trace");
        for replacement in PriorityClass::ALL {
            if replacement == original {
                continue;
            }
            let flipped = fixture.flipped(position, replacement);
            let result = verify(&fixture, &flipped, VerificationStrategy::Strict);

            assert_eq!(
                result.total_mismatches(),
                1,
                "flip of position {position} to {replacement}"
            );
            assert_eq!(result.mismatched(original), 1);
            assert_eq!(result.matched(original), baseline.matched(original) - 1);
            if replacement != PriorityClass::Urgent {
                assert_eq!(result.matched(replacement), baseline.matched(replacement));
            }

            let mismatch = must_some(result.mismatches.first().copied(), "one mismatch recorded");
            assert_eq!(mismatch.position, position);
            assert_eq!(mismatch.expected, Some(original));
            assert_eq!(mismatch.actual_class, replacement);
            assert_eq!(mismatch.actual_queue, queue_for(replacement));
            assert!(mismatch.window_start <= position && position <= mismatch.window_end);
            assert_accounted(&result);
        }
    }
}

#[test]
fn test_strict_mismatch_windows() {
    let fixture = WrrTraceFixture::standard();
    // position 9 sits in the first Medium window (8..=9)
    let flipped = fixture.flipped(9, PriorityClass::Low);
    let result = verify(&fixture, &flipped, VerificationStrategy::Strict);

    let mismatch = must_some(result.mismatches.first().copied(), "mismatch recorded");
    assert_eq!((mismatch.window_start, mismatch.window_end), (8, 9));
    assert!(!result.passed());
    assert!(matches!(
        result.into_result(),
        Err(ConformanceError::Arbitration(
            nvme_errors::ArbitrationError::Mismatch {
                total: 1,
                medium: 1,
                ..
            }
        ))
    ));
}

#[test]
fn test_relaxed_totals_follow_bindings() {
    let fixture = WrrTraceFixture::standard();
    let result = verify(&fixture, &fixture.trace, VerificationStrategy::Relaxed);

    for class in PriorityClass::ALL {
        let bound = u32::try_from(fixture.trace.count_for_queue(queue_for(class))).unwrap_or(0);
        assert_eq!(result.matched(class), bound, "{class}");
    }
    assert_eq!(result.total_mismatches(), 0);
    assert_accounted(&result);
}

#[test]
fn test_relaxed_ignores_weighted_ordering() {
    let fixture = WrrTraceFixture::standard();
    let mut entries = fixture.trace.clone().into_entries();
    if let Some(weighted) = entries.get_mut(4..) {
        weighted.reverse();
    }
    let reordered = ArbitrationTrace::from(entries);

    let relaxed = verify(&fixture, &reordered, VerificationStrategy::Relaxed);
    let strict = verify(&fixture, &reordered, VerificationStrategy::Strict);

    assert_eq!(relaxed.total_mismatches(), 0);
    assert!(strict.total_mismatches() > 0);
    assert_eq!(relaxed.matched(PriorityClass::High), 9);
}

#[test]
fn test_relaxed_catches_urgent_boundary() {
    let fixture = WrrTraceFixture::standard();
    let mut entries = fixture.trace.clone().into_entries();
    entries.swap(3, 4);
    let swapped = ArbitrationTrace::from(entries);

    let result = verify(&fixture, &swapped, VerificationStrategy::Relaxed);

    assert_eq!(result.mismatched(PriorityClass::Urgent), 2);
    assert_eq!(result.matched(PriorityClass::Urgent), 3);
    let positions: Vec<u32> = result.mismatches.iter().map(|m| m.position).collect();
    assert_eq!(positions, vec![4, 5]);
    assert_eq!(result.mismatches.get(1).and_then(|m| m.expected), None);
    assert_accounted(&result);
}

#[test]
fn test_cycle_limit_leaves_tail_unclassified() {
    let fixture = WrrTraceBuilder::new(ArbitrationWeights::new(2, 1, 0))
        .urgent(4)
        .weighted(16)
        .outstanding(PriorityClass::High, 2)
        .build();
    // tail is garbage once the top class is exhausted
    let flipped = fixture.flipped(20, PriorityClass::Low);
    let result = verify(&fixture, &flipped, VerificationStrategy::Strict);

    assert_eq!(result.cycle_limit, Some(1));
    assert_eq!(result.completed_cycles, 1);
    assert_eq!(result.unclassified, 10);
    assert_eq!(result.total_mismatches(), 0);
    assert_accounted(&result);
}

#[test]
fn test_tied_weights_follow_static_priority() {
    let weights = ArbitrationWeights::new(0, 1, 1);
    let order = compute_order(weights.high_weight, weights.medium_weight, weights.low_weight);
    assert_eq!(order.as_array(), [PriorityClass::Medium, PriorityClass::Low, PriorityClass::High]);

    let fixture = WrrTraceBuilder::new(weights)
        .ranked(order.as_array())
        .urgent(2)
        .weighted(15)
        .build();
    let result = verify(&fixture, &fixture.trace, VerificationStrategy::Strict);
    assert_eq!(result.total_mismatches(), 0);

    let static_order = WrrTraceBuilder::new(weights).urgent(2).weighted(15).build();
    let result = verify(&fixture, &static_order.trace, VerificationStrategy::Strict);
    assert!(result.total_mismatches() > 0);
}

#[test]
fn test_run_captures_and_verifies() {
    init_test_tracing();
    let fixture = WrrTraceFixture::standard();
    let device = SimulatedDevice::from_trace(FIXTURE_QUEUE_COUNT, &fixture.trace);
    let mut engine = ReapEngine::new(device);

    let run = ArbitrationRun::new(&fixture.registry, fixture.weights);
    assert_eq!(run.target(), 20);
    let result = must(run.execute(&mut engine));

    assert!(result.passed(), "{}", result.summary());
    assert_eq!(result.reaped, 20);
    assert_eq!(result.reap_status, ReapStatus::Complete);
}

#[test]
fn test_run_timeout_still_verifies_partial_trace() {
    let fixture = WrrTraceBuilder::new(ArbitrationWeights::new(2, 1, 0))
        .urgent(4)
        .weighted(16)
        .outstanding(PriorityClass::Low, 5)
        .build();
    let device = SimulatedDevice::from_trace(FIXTURE_QUEUE_COUNT, &fixture.trace);
    let config = must(ReapConfig::builder().timeout_ms(20).build());
    let mut engine = ReapEngine::with_config(device, config);

    let result = must(
        ArbitrationRun::new(&fixture.registry, fixture.weights)
            .strategy(VerificationStrategy::Relaxed)
            .execute(&mut engine),
    );

    assert!(matches!(
        result.reap_status,
        ReapStatus::Timeout {
            expected: 23,
            reaped: 20,
            ..
        }
    ));
    assert_eq!(result.total_mismatches(), 0);
    assert!(!result.passed());
    assert!(matches!(
        result.into_result(),
        Err(ConformanceError::Queue(QueueError::Timeout { .. }))
    ));
}

#[test]
fn test_run_hardware_status_fails_judgment() {
    let fixture = WrrTraceFixture::standard();
    let trace: ArbitrationTrace = fixture
        .trace
        .positions()
        .map(|(pos, entry)| if pos == 7 { entry.with_status(0x0004) } else { *entry })
        .collect();
    let device = SimulatedDevice::from_trace(FIXTURE_QUEUE_COUNT, &trace);
    let mut engine = ReapEngine::new(device);

    let result = must(ArbitrationRun::new(&fixture.registry, fixture.weights).execute(&mut engine));

    assert_eq!(result.total_mismatches(), 0);
    assert_eq!(
        result.reap_status,
        ReapStatus::HardwareStatus {
            failed_entries: 1,
            first_status: 0x0004
        }
    );
    assert!(!result.passed());
}

#[test]
fn test_run_invalid_queue_is_an_error() {
    let fixture = WrrTraceFixture::standard();
    let device = SimulatedDevice::new(2);
    let mut engine = ReapEngine::new(device);

    let err = must_err(ArbitrationRun::new(&fixture.registry, fixture.weights).execute(&mut engine));

    assert!(matches!(
        err.root(),
        ConformanceError::Queue(QueueError::InvalidQueue { queue_id: 3, .. })
    ));
    let context = must_some(err.contexts().next(), "capture context attached");
    assert_eq!(context.operation, "arbitration capture");
    assert_eq!(context.field("expected"), Some("20"));
}

#[test]
fn test_run_rejects_queue_subset_missing_outstanding_queue() {
    let fixture = WrrTraceFixture::standard();
    let device = SimulatedDevice::from_trace(FIXTURE_QUEUE_COUNT, &fixture.trace);
    let handle = device.clone();
    let mut engine = ReapEngine::new(device);

    // Urgent queue left out while it still has 4 commands outstanding
    let err = must_err(
        ArbitrationRun::new(&fixture.registry, fixture.weights)
            .queues(vec![HIGH_QUEUE, MEDIUM_QUEUE, LOW_QUEUE])
            .execute(&mut engine),
    );

    assert!(matches!(
        err.root(),
        ConformanceError::Config(ConfigError::Inconsistent(msg)) if msg.contains("queue 3")
    ));
    assert!(handle.drain_calls().is_empty());
}

#[test]
fn test_run_allows_subset_without_idle_queues() {
    let registry = StaticQueueRegistry::new()
        .with_queue(1, PriorityClass::High, 2)
        .with_queue(2, PriorityClass::Medium, 0);
    let trace: ArbitrationTrace = (0u16..2).map(|cid| CompletionEntry::success(1, cid)).collect();
    let mut engine = ReapEngine::new(SimulatedDevice::from_trace(2, &trace));

    let result = must(
        ArbitrationRun::new(&registry, ArbitrationWeights::new(1, 0, 0))
            .queues(vec![1])
            .execute(&mut engine),
    );

    assert_eq!(result.reaped, 2);
    assert!(result.passed(), "{}", result.summary());
}

#[test]
fn test_run_with_explicit_queues_and_total() {
    let registry = StaticQueueRegistry::new()
        .with_queue(1, PriorityClass::High, 3)
        .with_queue(2, PriorityClass::Medium, 3);
    let trace: ArbitrationTrace = [1, 2, 1, 2]
        .iter()
        .zip(0u16..)
        .map(|(&q, cid)| CompletionEntry::success(q, cid))
        .collect();
    let device = SimulatedDevice::from_trace(2, &trace);
    let mut engine = ReapEngine::new(device);

    let run = ArbitrationRun::new(&registry, ArbitrationWeights::new(0, 0, 0))
        .strategy(VerificationStrategy::Relaxed)
        .queues(vec![1, 2])
        .expected_total(4);
    let result = must(run.execute(&mut engine));

    assert_eq!(result.reaped, 4);
    assert_eq!(result.total_mismatches(), 0);
}

#[test]
fn test_result_serializes() -> TestResult {
    let fixture = WrrTraceFixture::standard();
    let result = verify(&fixture, &fixture.flipped(6, PriorityClass::Low), VerificationStrategy::Strict);
    let json = serde_json::to_string(&result)?;
    let back: VerificationResult = serde_json::from_str(&json)?;
    assert_eq!(back, result);
    Ok(())
}
