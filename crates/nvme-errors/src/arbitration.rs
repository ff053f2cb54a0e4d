//! Arbitration verification errors.

use crate::common::ErrorSeverity;

/// Errors raised while judging a completion trace against the arbitration policy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArbitrationError {
    /// Positions were serviced by the wrong priority class.
    #[error(
        "{total} arbitration mismatch(es): urgent={urgent}, high={high}, medium={medium}, low={low}"
    )]
    Mismatch {
        /// Sum of all per-class mismatch counters
        total: u32,
        /// Urgent mismatches
        urgent: u32,
        /// High-priority mismatches
        high: u32,
        /// Medium-priority mismatches
        medium: u32,
        /// Low-priority mismatches
        low: u32,
    },

    /// A trace entry came from a queue with no priority binding.
    #[error("Submission queue {queue_id} has no priority binding")]
    UnboundQueue {
        /// Submission queue id carried by the completion entry
        queue_id: u16,
    },
}

impl ArbitrationError {
    /// Get the error severity.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ArbitrationError::Mismatch { .. } => ErrorSeverity::Error,
            ArbitrationError::UnboundQueue { .. } => ErrorSeverity::Error,
        }
    }

    /// Create a mismatch error from per-class counters.
    pub fn mismatch(urgent: u32, high: u32, medium: u32, low: u32) -> Self {
        ArbitrationError::Mismatch {
            total: urgent
                .saturating_add(high)
                .saturating_add(medium)
                .saturating_add(low),
            urgent,
            high,
            medium,
            low,
        }
    }

    /// Create an unbound queue error.
    pub fn unbound_queue(queue_id: u16) -> Self {
        ArbitrationError::UnboundQueue { queue_id }
    }
}
