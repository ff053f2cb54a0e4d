//! Capture-and-verify runs.

use nvme_errors::{ConfigError, ConformanceError, ResultExt, error_context};
use nvme_queue::{ArbitrationTrace, ArbitrationWeights, DeviceInterface, QueueId, QueueRegistry};
use nvme_reap::ReapEngine;
use tracing::{info, warn};

use crate::result::{ReapStatus, VerificationResult, VerificationStrategy};
use crate::verifier::verify_arbitration;

/// One arbitration check: capture a trace across the active queues, then
/// verify it.
///
/// Weights and queue bindings are snapshots taken when the run is built.
/// A capture that times out or reports hardware status failures is still
/// verified; the capture status is carried in the result and fails the
/// judgment.
#[derive(Debug, Clone)]
pub struct ArbitrationRun<'a, R: ?Sized> {
    registry: &'a R,
    weights: ArbitrationWeights,
    strategy: VerificationStrategy,
    queue_ids: Vec<QueueId>,
    expected_total: Option<u32>,
}

impl<'a, R: QueueRegistry + ?Sized> ArbitrationRun<'a, R> {
    /// Run over every queue in `registry` with the strict strategy.
    pub fn new(registry: &'a R, weights: ArbitrationWeights) -> Self {
        Self {
            registry,
            weights,
            strategy: VerificationStrategy::Strict,
            queue_ids: registry.queue_ids(),
            expected_total: None,
        }
    }

    #[must_use]
    pub fn strategy(mut self, strategy: VerificationStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Restrict the capture to `queue_ids`, polled in this order.
    ///
    /// Every registry queue with outstanding commands must be in the list;
    /// the Urgent prefix and cycle limit are derived from the whole
    /// registry, so [`execute`](Self::execute) rejects a subset that leaves
    /// one out.
    #[must_use]
    pub fn queues(mut self, queue_ids: impl Into<Vec<QueueId>>) -> Self {
        self.queue_ids = queue_ids.into();
        self
    }

    /// Override the number of completions to capture.
    #[must_use]
    pub fn expected_total(mut self, expected_total: u32) -> Self {
        self.expected_total = Some(expected_total);
        self
    }

    /// Completions the capture waits for: the override, or the outstanding
    /// count summed over the captured queues.
    pub fn target(&self) -> u32 {
        self.expected_total.unwrap_or_else(|| {
            self.queue_ids
                .iter()
                .map(|&id| self.registry.queue_outstanding_count(id))
                .fold(0u32, u32::saturating_add)
        })
    }

    /// Registry queue with outstanding commands that the capture would skip.
    fn uncaptured_queue(&self) -> Option<(QueueId, u32)> {
        self.registry
            .queue_ids()
            .into_iter()
            .map(|id| (id, self.registry.queue_outstanding_count(id)))
            .find(|&(id, outstanding)| outstanding > 0 && !self.queue_ids.contains(&id))
    }

    /// Capture and verify.
    ///
    /// # Errors
    ///
    /// Errors carry the failing step as context; match on
    /// [`ConformanceError::root`] for the underlying error:
    ///
    /// - `ConfigError::Inconsistent` if a queue with outstanding commands is
    ///   left out of [`queues`](Self::queues) (no polling)
    /// - `QueueError::InvalidQueue`, `CapacityExceeded` or `DeviceFailure` from the capture
    /// - `ArbitrationError::UnboundQueue` if a captured entry's queue has no binding
    ///
    /// Timeouts and mismatches are not errors here; they fail
    /// [`VerificationResult::passed`].
    pub fn execute<D: DeviceInterface>(
        &self,
        engine: &mut ReapEngine<D>,
    ) -> Result<VerificationResult, ConformanceError> {
        let expected = self.target();
        let queues = format!("{:?}", self.queue_ids);

        if let Some((queue_id, outstanding)) = self.uncaptured_queue() {
            warn!(
                queue_id,
                outstanding,
                queues = %queues,
                "queue with outstanding commands left out of capture"
            );
            return Err(ConfigError::inconsistent(format!(
                "queue {queue_id} has {outstanding} outstanding commands but is not captured"
            )))
            .context(error_context!("arbitration capture", queues, expected));
        }

        let reserve = expected.min(engine.config().buffer_capacity);
        let mut trace = ArbitrationTrace::with_capacity(usize::try_from(reserve).unwrap_or(0));

        let reap_status = match engine.reap_trace_into(&self.queue_ids, expected, &mut trace) {
            Ok(outcome) => ReapStatus::from_outcome(&outcome),
            Err(err) => match ReapStatus::from_error(&err) {
                Some(status) => {
                    warn!(
                        captured = trace.len(),
                        expected, "verifying partial trace after capture failure"
                    );
                    status
                }
                None => {
                    warn!(
                        queues = %queues,
                        expected,
                        severity = %err.severity(),
                        error = %err,
                        "trace capture failed"
                    );
                    return Err(err)
                        .context(error_context!("arbitration capture", queues, expected));
                }
            },
        };

        let reaped = trace.len();
        let result = verify_arbitration(&trace, &self.weights, self.registry, self.strategy)
            .with_context(|| {
                error_context!("arbitration verify", strategy = self.strategy, reaped)
            })?
            .with_reap_status(reap_status);

        info!(
            strategy = %self.strategy,
            weights = %self.weights,
            passed = result.passed(),
            "{}",
            result.summary()
        );
        Ok(result)
    }
}
