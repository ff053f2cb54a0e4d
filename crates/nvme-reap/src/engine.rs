//! Reap engine.
//!
//! Single-threaded cooperative polling: every call runs to completion or
//! timeout before returning. A multi-queue capture polls its queues round
//! robin inside one shared idle deadline, so a slow queue consumes budget
//! that later queues in the same round would otherwise have had.

use std::time::{Duration, Instant};

use nvme_errors::{QueueError, QueueResult};
use nvme_queue::{ArbitrationTrace, CompletionEntry, DeviceInterface, QueueId};
use tracing::{debug, error, warn};

use crate::config::ReapConfig;
use crate::scan::{ReapOutcome, StatusScan, scan_completions};
use crate::session::ReapSession;

/// A trace returned by [`ReapEngine::reap_trace`] together with how the
/// capture ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceCapture {
    /// Entries in drain order, partial when `status` is an error
    pub trace: ArbitrationTrace,
    /// Outcome of the capture
    pub status: QueueResult<ReapOutcome>,
}

impl TraceCapture {
    /// True when all expected completions arrived.
    pub fn is_complete(&self) -> bool {
        self.status.is_ok()
    }

    /// The trace if the capture completed.
    ///
    /// # Errors
    ///
    /// Returns the capture error; the partial trace is dropped.
    pub fn into_result(self) -> QueueResult<ArbitrationTrace> {
        self.status.map(|_| self.trace)
    }
}

/// Drains completion queues through a [`DeviceInterface`].
#[derive(Debug)]
pub struct ReapEngine<D> {
    device: D,
    config: ReapConfig,
}

impl<D: DeviceInterface> ReapEngine<D> {
    /// Create an engine with the default configuration.
    pub fn new(device: D) -> Self {
        Self::with_config(device, ReapConfig::default())
    }

    /// Create an engine with `config`.
    ///
    /// The configuration is expected to have been validated, typically by
    /// [`ReapConfig::builder`].
    pub fn with_config(device: D, config: ReapConfig) -> Self {
        Self { device, config }
    }

    pub fn config(&self) -> &ReapConfig {
        &self.config
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn into_device(self) -> D {
        self.device
    }

    /// Reap `expected` completions from `queue_id` into `buffer`.
    ///
    /// Entries are appended to `buffer` in delivery order. On timeout the
    /// partial entries stay in `buffer`.
    ///
    /// # Errors
    ///
    /// - `InvalidQueue` if `queue_id` exceeds the device's queue count (no polling)
    /// - `CapacityExceeded` if `buffer` cannot hold `expected` more entries (no polling)
    /// - `Timeout` if the idle deadline passes before `expected` entries arrive
    /// - `DeviceFailure` if the device interface fails a drain
    pub fn reap(
        &mut self,
        queue_id: QueueId,
        expected: u32,
        buffer: &mut Vec<CompletionEntry>,
    ) -> QueueResult<ReapOutcome> {
        self.reap_with_display(queue_id, expected, buffer, StatusScan::Enabled)
    }

    /// [`ReapEngine::reap`] with a selectable post-reap status scan.
    ///
    /// # Errors
    ///
    /// Same as [`ReapEngine::reap`].
    pub fn reap_with_display(
        &mut self,
        queue_id: QueueId,
        expected: u32,
        buffer: &mut Vec<CompletionEntry>,
        scan: StatusScan,
    ) -> QueueResult<ReapOutcome> {
        self.check_queue(queue_id)?;
        let capacity = self.check_capacity(buffer.len(), expected)?;

        let start = buffer.len();
        let mut session = ReapSession::new(Some(queue_id), expected, capacity);
        let polled = self.poll_until_complete(&mut session, &[queue_id], |batch| {
            buffer.extend_from_slice(batch);
        });

        let outcome = scan_completions(buffer.get(start..).unwrap_or_default(), Some(queue_id), scan);
        polled?;
        debug!(
            queue_id,
            reaped = outcome.reaped,
            hardware_error = outcome.hardware_error,
            polls = session.elapsed_poll_iterations(),
            "reap complete"
        );
        Ok(outcome)
    }

    /// Capture `expected_total` completions across `queue_ids` into `trace`.
    ///
    /// Queues are polled round robin within one idle deadline; entries are
    /// appended in the order they were drained. On timeout the partial
    /// trace stays in `trace`.
    ///
    /// # Errors
    ///
    /// As for [`ReapEngine::reap`], with `Timeout` carrying no queue id.
    pub fn reap_trace_into(
        &mut self,
        queue_ids: &[QueueId],
        expected_total: u32,
        trace: &mut ArbitrationTrace,
    ) -> QueueResult<ReapOutcome> {
        for &queue_id in queue_ids {
            self.check_queue(queue_id)?;
        }
        let capacity = self.check_capacity(trace.len(), expected_total)?;

        let start = trace.len();
        let mut session = ReapSession::new(None, expected_total, capacity);
        let polled = self.poll_until_complete(&mut session, queue_ids, |batch| {
            trace.extend_from_slice(batch);
        });

        let captured = trace.entries().get(start..).unwrap_or_default();
        let outcome = scan_completions(captured, None, StatusScan::Enabled);
        polled?;
        debug!(
            queues = queue_ids.len(),
            reaped = outcome.reaped,
            hardware_error = outcome.hardware_error,
            polls = session.elapsed_poll_iterations(),
            "trace capture complete"
        );
        Ok(outcome)
    }

    /// Capture a fresh trace of `expected_total` completions across `queue_ids`.
    ///
    /// The entries drained before a failure are kept in the returned
    /// [`TraceCapture`]; once drained they cannot be read from the device
    /// again. Hardware status failures are logged and left in the entries.
    pub fn reap_trace(&mut self, queue_ids: &[QueueId], expected_total: u32) -> TraceCapture {
        let mut trace = ArbitrationTrace::with_capacity(
            usize::try_from(expected_total.min(self.config.buffer_capacity)).unwrap_or(0),
        );
        let status = self.reap_trace_into(queue_ids, expected_total, &mut trace);
        TraceCapture { trace, status }
    }

    fn check_queue(&self, queue_id: QueueId) -> QueueResult<()> {
        let queue_count = self.device.completion_queue_count();
        if queue_id > queue_count {
            warn!(queue_id, queue_count, "completion queue id out of range");
            return Err(QueueError::invalid_queue(queue_id, queue_count));
        }
        Ok(())
    }

    fn check_capacity(&self, buffered: usize, expected: u32) -> QueueResult<u32> {
        let buffered = u32::try_from(buffered).unwrap_or(u32::MAX);
        let capacity = self.config.buffer_capacity.saturating_sub(buffered);
        if expected > capacity {
            warn!(expected, capacity, "reap buffer too small");
            return Err(QueueError::CapacityExceeded {
                requested: expected,
                capacity,
            });
        }
        Ok(capacity)
    }

    fn poll_until_complete<F>(
        &mut self,
        session: &mut ReapSession,
        queue_ids: &[QueueId],
        mut sink: F,
    ) -> QueueResult<()>
    where
        F: FnMut(&[CompletionEntry]),
    {
        let timeout = self.config.timeout();
        let poll_interval = self.config.poll_interval();
        let started = Instant::now();
        let mut deadline = started + timeout;

        while !session.is_complete() {
            let mut progressed = false;

            for &queue_id in queue_ids {
                let limit = session.next_drain_limit();
                if limit == 0 {
                    break;
                }
                let batch = self.device.drain_completions(queue_id, limit)?;
                if batch.is_empty() {
                    continue;
                }

                let accepted = batch.len().min(usize::try_from(limit).unwrap_or(usize::MAX));
                if accepted < batch.len() {
                    warn!(
                        queue_id,
                        limit,
                        delivered = batch.len(),
                        "device returned more entries than requested, extra entries dropped"
                    );
                }
                sink(batch.get(..accepted).unwrap_or_default());
                session.record_drain(u32::try_from(accepted).unwrap_or(u32::MAX));
                progressed = true;
            }

            session.record_poll();
            if session.is_complete() {
                break;
            }

            let now = Instant::now();
            if progressed {
                deadline = now + timeout;
            } else if now >= deadline {
                let waited_ms = elapsed_ms(now.saturating_duration_since(started));
                error!(
                    queue_id = ?session.target_queue_id(),
                    expected = session.expected_count(),
                    reaped = session.collected_count(),
                    waited_ms,
                    polls = session.elapsed_poll_iterations(),
                    "timed out waiting for completions"
                );
                return Err(QueueError::timeout(
                    session.target_queue_id(),
                    session.expected_count(),
                    session.collected_count(),
                    waited_ms,
                ));
            }

            std::thread::sleep(poll_interval);
        }

        Ok(())
    }
}

fn elapsed_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
