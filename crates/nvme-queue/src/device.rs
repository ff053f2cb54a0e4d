//! Device interface trait.

use nvme_errors::QueueResult;

use crate::{CompletionEntry, QueueId};

/// Transport that delivers completions from the controller.
///
/// Implementations wrap whatever actually talks to the device (a driver
/// ioctl, a user-space queue mapping, a simulator).
pub trait DeviceInterface {
    /// Highest valid completion queue id. The admin queue is id 0.
    fn completion_queue_count(&self) -> u16;

    /// Drain up to `max_entries` newly posted completions from `queue_id`.
    ///
    /// Non-blocking; returns an empty batch when nothing is pending.
    /// Returned entries are consumed and will not be delivered again.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::DeviceFailure` when the transport itself fails.
    fn drain_completions(
        &mut self,
        queue_id: QueueId,
        max_entries: u32,
    ) -> QueueResult<Vec<CompletionEntry>>;
}

impl<T: DeviceInterface + ?Sized> DeviceInterface for &mut T {
    fn completion_queue_count(&self) -> u16 {
        (**self).completion_queue_count()
    }

    fn drain_completions(
        &mut self,
        queue_id: QueueId,
        max_entries: u32,
    ) -> QueueResult<Vec<CompletionEntry>> {
        (**self).drain_completions(queue_id, max_entries)
    }
}

impl<T: DeviceInterface + ?Sized> DeviceInterface for Box<T> {
    fn completion_queue_count(&self) -> u16 {
        (**self).completion_queue_count()
    }

    fn drain_completions(
        &mut self,
        queue_id: QueueId,
        max_entries: u32,
    ) -> QueueResult<Vec<CompletionEntry>> {
        (**self).drain_completions(queue_id, max_entries)
    }
}
