//! Completion-queue reaping errors.
//!
//! This module provides the errors raised while draining completion entries
//! from one or more completion queues.

use crate::common::ErrorSeverity;

/// Errors raised by the reap engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    /// Queue id outside the range known to the controller. No polling is attempted.
    #[error("Invalid queue {queue_id}: controller has {queue_count} completion queues")]
    InvalidQueue {
        /// Requested queue id
        queue_id: u16,
        /// Highest valid I/O completion queue id
        queue_count: u16,
    },

    /// Expected completion count not reached within the polling budget.
    #[error(
        "Reap timeout on {}: expected {expected}, reaped {reaped} after {waited_ms}ms",
        describe_queue(.queue_id)
    )]
    Timeout {
        /// Queue being reaped, `None` for a multi-queue trace capture
        queue_id: Option<u16>,
        /// Expected completion count
        expected: u32,
        /// Completions collected before the deadline passed
        reaped: u32,
        /// Idle time that elapsed before giving up, in milliseconds
        waited_ms: u64,
    },

    /// One or more reaped entries carried a nonzero status code.
    #[error("{failed_entries} completion(s) reported a hardware status, first status {first_status:#x}")]
    HardwareStatus {
        /// Number of entries with a nonzero status code
        failed_entries: u32,
        /// Status code of the first failing entry
        first_status: u16,
    },

    /// Expected count can never fit in the reap buffer.
    #[error("Requested {requested} completions but reap buffer holds {capacity}")]
    CapacityExceeded {
        /// Requested completion count
        requested: u32,
        /// Buffer capacity in entries
        capacity: u32,
    },

    /// The device interface failed the drain call itself.
    #[error("Device interface failed draining queue {queue_id}: {message}")]
    DeviceFailure {
        /// Queue being drained
        queue_id: u16,
        /// Error message from the device interface
        message: String,
    },
}

fn describe_queue(queue_id: &Option<u16>) -> String {
    match queue_id {
        Some(id) => format!("cq {id}"),
        None => "all queues".to_string(),
    }
}

impl QueueError {
    /// Get the error severity.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            QueueError::InvalidQueue { .. } => ErrorSeverity::Error,
            QueueError::Timeout { .. } => ErrorSeverity::Warning,
            QueueError::HardwareStatus { .. } => ErrorSeverity::Warning,
            QueueError::CapacityExceeded { .. } => ErrorSeverity::Error,
            QueueError::DeviceFailure { .. } => ErrorSeverity::Error,
        }
    }

    /// Check if this error ends the call that raised it.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, QueueError::HardwareStatus { .. })
    }

    /// Check if the error was raised before any polling took place.
    pub fn is_fail_fast(&self) -> bool {
        matches!(
            self,
            QueueError::InvalidQueue { .. } | QueueError::CapacityExceeded { .. }
        )
    }

    /// Create an invalid queue error.
    pub fn invalid_queue(queue_id: u16, queue_count: u16) -> Self {
        QueueError::InvalidQueue {
            queue_id,
            queue_count,
        }
    }

    /// Create a timeout error.
    pub fn timeout(queue_id: Option<u16>, expected: u32, reaped: u32, waited_ms: u64) -> Self {
        QueueError::Timeout {
            queue_id,
            expected,
            reaped,
            waited_ms,
        }
    }

    /// Create a hardware status error.
    pub fn hardware_status(failed_entries: u32, first_status: u16) -> Self {
        QueueError::HardwareStatus {
            failed_entries,
            first_status,
        }
    }

    /// Create a device failure error.
    pub fn device_failure(queue_id: u16, message: impl Into<String>) -> Self {
        QueueError::DeviceFailure {
            queue_id,
            message: message.into(),
        }
    }
}
