//! Per-call reap accumulator.

use nvme_queue::QueueId;

/// State of one reap call. Created at call entry and discarded on return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReapSession {
    target_queue_id: Option<QueueId>,
    expected_count: u32,
    collected_count: u32,
    remaining_buffer_capacity: u32,
    elapsed_poll_iterations: u64,
}

impl ReapSession {
    /// Start a session. `target_queue_id` is `None` for a multi-queue capture.
    pub fn new(target_queue_id: Option<QueueId>, expected_count: u32, buffer_capacity: u32) -> Self {
        Self {
            target_queue_id,
            expected_count,
            collected_count: 0,
            remaining_buffer_capacity: buffer_capacity,
            elapsed_poll_iterations: 0,
        }
    }

    pub fn target_queue_id(&self) -> Option<QueueId> {
        self.target_queue_id
    }

    pub fn expected_count(&self) -> u32 {
        self.expected_count
    }

    pub fn collected_count(&self) -> u32 {
        self.collected_count
    }

    pub fn remaining_buffer_capacity(&self) -> u32 {
        self.remaining_buffer_capacity
    }

    pub fn elapsed_poll_iterations(&self) -> u64 {
        self.elapsed_poll_iterations
    }

    /// Completions still expected.
    pub fn remaining(&self) -> u32 {
        self.expected_count.saturating_sub(self.collected_count)
    }

    /// Largest batch the next drain may accept.
    pub fn next_drain_limit(&self) -> u32 {
        self.remaining().min(self.remaining_buffer_capacity)
    }

    pub fn is_complete(&self) -> bool {
        self.collected_count >= self.expected_count
    }

    /// Account for `count` entries appended to the buffer.
    pub fn record_drain(&mut self, count: u32) {
        self.collected_count = self.collected_count.saturating_add(count);
        self.remaining_buffer_capacity = self.remaining_buffer_capacity.saturating_sub(count);
    }

    /// Account for one poll round.
    pub fn record_poll(&mut self) {
        self.elapsed_poll_iterations = self.elapsed_poll_iterations.saturating_add(1);
    }
}
