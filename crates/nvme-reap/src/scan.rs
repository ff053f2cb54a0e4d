//! Post-reap status scan and reap outcome.

use nvme_errors::{QueueError, QueueResult};
use nvme_queue::{CompletionEntry, QueueId};
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

/// Whether a reap scans the collected entries' status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StatusScan {
    /// Log every entry and flag nonzero status codes
    #[default]
    Enabled,
    /// Skip the scan; expected error statuses pass through unflagged
    Suppressed,
}

/// Result of a completed reap call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReapOutcome {
    /// Entries collected by this call
    pub reaped: u32,
    /// Set when at least one collected entry carried a nonzero status code
    pub hardware_error: bool,
    /// Entries with a nonzero status code
    pub failed_entries: u32,
    /// Status code of the first failing entry
    pub first_status: Option<u16>,
}

impl ReapOutcome {
    /// Outcome with no status failures.
    pub fn clean(reaped: u32) -> Self {
        Self {
            reaped,
            hardware_error: false,
            failed_entries: 0,
            first_status: None,
        }
    }

    /// The `(reaped, error_flag)` pair.
    pub fn as_pair(&self) -> (u32, bool) {
        (self.reaped, self.hardware_error)
    }

    /// Convert the hardware error flag into an error.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::HardwareStatus` when the flag is set.
    pub fn into_result(self) -> QueueResult<u32> {
        if self.hardware_error {
            return Err(QueueError::hardware_status(
                self.failed_entries,
                self.first_status.unwrap_or_default(),
            ));
        }
        Ok(self.reaped)
    }
}

/// Scan `entries`, logging each one, and build the outcome.
pub fn scan_completions(
    entries: &[CompletionEntry],
    queue_id: Option<QueueId>,
    scan: StatusScan,
) -> ReapOutcome {
    let reaped = u32::try_from(entries.len()).unwrap_or(u32::MAX);
    if scan == StatusScan::Suppressed {
        return ReapOutcome::clean(reaped);
    }

    let mut outcome = ReapOutcome::clean(reaped);
    for entry in entries {
        if entry.is_success() {
            trace!(?queue_id, %entry, "completion");
            continue;
        }
        warn!(
            ?queue_id,
            sct = entry.status_code_type(),
            sc = entry.status_code_value(),
            dnr = entry.do_not_retry(),
            %entry,
            "completion reported error status"
        );
        outcome.hardware_error = true;
        outcome.failed_entries = outcome.failed_entries.saturating_add(1);
        if outcome.first_status.is_none() {
            outcome.first_status = Some(entry.status_code);
        }
    }
    outcome
}
