//! Simulated device interface.
//!
//! [`SimulatedDevice`] delivers completions according to a script instead
//! of talking to hardware. Clones share state, so a test can keep a handle
//! to inspect drain calls or post late completions after moving the device
//! into an engine.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use nvme_errors::{QueueError, QueueResult};
use nvme_queue::{ArbitrationTrace, CompletionEntry, DeviceInterface, QueueId};
use parking_lot::Mutex;

/// One recorded `drain_completions` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainCall {
    /// Queue that was drained
    pub queue_id: QueueId,
    /// `max_entries` passed by the caller
    pub max_entries: u32,
    /// Entries actually returned
    pub returned: usize,
}

#[derive(Debug, Default)]
struct SimulatedState {
    queue_count: u16,
    /// Per-queue scripted batches; an empty batch is an empty poll
    batches: BTreeMap<QueueId, VecDeque<Vec<CompletionEntry>>>,
    /// Completions released in global service order
    ordered: VecDeque<CompletionEntry>,
    /// Fail every drain once this many calls have succeeded
    fail_after: Option<(usize, String)>,
    calls: Vec<DrainCall>,
}

impl SimulatedState {
    fn next_scripted(&mut self, queue_id: QueueId, max: usize) -> Vec<CompletionEntry> {
        let Some(queue) = self.batches.get_mut(&queue_id) else {
            return Vec::new();
        };
        let Some(mut batch) = queue.pop_front() else {
            return Vec::new();
        };
        if batch.len() > max {
            let rest = batch.split_off(max);
            queue.push_front(rest);
        }
        batch
    }

    fn next_ordered(&mut self, queue_id: QueueId, max: usize) -> Vec<CompletionEntry> {
        let mut out = Vec::new();
        while out.len() < max {
            match self.ordered.front() {
                Some(entry) if entry.sq_id == queue_id => {
                    if let Some(entry) = self.ordered.pop_front() {
                        out.push(entry);
                    }
                }
                _ => break,
            }
        }
        out
    }
}

/// Scripted stand-in for a controller's completion queues.
#[derive(Debug, Clone, Default)]
pub struct SimulatedDevice {
    state: Arc<Mutex<SimulatedState>>,
}

impl SimulatedDevice {
    /// Device exposing completion queues `0..=queue_count` with nothing pending.
    pub fn new(queue_count: u16) -> Self {
        let device = Self::default();
        device.state.lock().queue_count = queue_count;
        device
    }

    /// Device that never posts a completion.
    pub fn silent(queue_count: u16) -> Self {
        Self::new(queue_count)
    }

    /// Device whose drain calls fail with `DeviceFailure` after `successful_calls`.
    pub fn failing_after(queue_count: u16, successful_calls: usize, message: &str) -> Self {
        let device = Self::new(queue_count);
        device.state.lock().fail_after = Some((successful_calls, message.to_string()));
        device
    }

    /// Device that releases `trace` in order.
    ///
    /// A drain of queue `q` returns the run of entries at the head of the
    /// trace owned by `q`, so a round robin poller reproduces the trace
    /// order exactly.
    pub fn from_trace(queue_count: u16, trace: &ArbitrationTrace) -> Self {
        let device = Self::new(queue_count);
        device.state.lock().ordered = trace.iter().copied().collect();
        device
    }

    /// Script the batches returned by successive drains of `queue_id`.
    #[must_use]
    pub fn with_batches(self, queue_id: QueueId, batches: Vec<Vec<CompletionEntry>>) -> Self {
        for batch in batches {
            self.push_batch(queue_id, batch);
        }
        self
    }

    /// Deliver `count` successful completions on `queue_id` split over `polls` drains.
    ///
    /// Command ids run from zero. The last poll takes the remainder.
    #[must_use]
    pub fn with_split_delivery(self, queue_id: QueueId, count: u16, polls: u16) -> Self {
        let polls = polls.max(1);
        let per_poll = usize::from((count / polls).max(1));
        let mut pushed = 1u16;
        let mut batch = Vec::new();
        for cid in 0..count {
            batch.push(CompletionEntry::success(queue_id, cid));
            if pushed < polls && batch.len() == per_poll {
                self.push_batch(queue_id, std::mem::take(&mut batch));
                pushed += 1;
            }
        }
        if !batch.is_empty() {
            self.push_batch(queue_id, batch);
        }
        self
    }

    /// Queue a batch behind anything already scripted for `queue_id`.
    pub fn push_batch(&self, queue_id: QueueId, batch: Vec<CompletionEntry>) {
        self.state
            .lock()
            .batches
            .entry(queue_id)
            .or_default()
            .push_back(batch);
    }

    /// Every drain call seen so far.
    pub fn drain_calls(&self) -> Vec<DrainCall> {
        self.state.lock().calls.clone()
    }

    /// Drain calls that returned nothing.
    pub fn empty_polls(&self) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| call.returned == 0)
            .count()
    }

    /// Entries scripted but not yet delivered.
    pub fn pending(&self) -> usize {
        let state = self.state.lock();
        let scripted: usize = state
            .batches
            .values()
            .flat_map(|queue| queue.iter())
            .map(Vec::len)
            .sum();
        scripted + state.ordered.len()
    }
}

impl DeviceInterface for SimulatedDevice {
    fn completion_queue_count(&self) -> u16 {
        self.state.lock().queue_count
    }

    fn drain_completions(
        &mut self,
        queue_id: QueueId,
        max_entries: u32,
    ) -> QueueResult<Vec<CompletionEntry>> {
        let mut state = self.state.lock();

        if let Some((successful_calls, message)) = &state.fail_after {
            if state.calls.len() >= *successful_calls {
                return Err(QueueError::device_failure(queue_id, message.clone()));
            }
        }

        let max = usize::try_from(max_entries).unwrap_or(usize::MAX);
        let mut entries = state.next_scripted(queue_id, max);
        if entries.is_empty() {
            entries = state.next_ordered(queue_id, max);
        }

        state.calls.push(DrainCall {
            queue_id,
            max_entries,
            returned: entries.len(),
        });
        Ok(entries)
    }
}
