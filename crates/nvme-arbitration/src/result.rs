//! Verification results.

use core::fmt;

use nvme_errors::{ArbitrationError, ConformanceError, QueueError};
use nvme_queue::{PriorityClass, QueueId};
use nvme_reap::ReapOutcome;
use serde::{Deserialize, Serialize};

use crate::order::PriorityOrder;

/// Verification strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VerificationStrategy {
    /// Check every position against its expected window
    #[default]
    Strict,
    /// Check the Urgent prefix, then tally entries under their own class
    Relaxed,
}

impl fmt::Display for VerificationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationStrategy::Strict => write!(f, "strict"),
            VerificationStrategy::Relaxed => write!(f, "relaxed"),
        }
    }
}

/// Match and mismatch counts for one class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassTally {
    pub matched: u32,
    pub mismatched: u32,
}

impl ClassTally {
    pub fn total(&self) -> u32 {
        self.matched.saturating_add(self.mismatched)
    }
}

/// One position serviced by the wrong class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mismatch {
    /// 1-based trace position
    pub position: u32,
    /// First position of the window the entry fell in
    pub window_start: u32,
    /// Last position of the window the entry fell in
    pub window_end: u32,
    /// Class the window expected. `None` means any weighted class.
    pub expected: Option<PriorityClass>,
    /// Queue that owns the entry
    pub actual_queue: QueueId,
    /// Class that queue is bound to
    pub actual_class: PriorityClass,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let expected = match self.expected {
            Some(class) => class.to_string(),
            None => "weighted".to_string(),
        };
        write!(
            f,
            "position {} (window {}..={}): expected {}, got queue {} ({})",
            self.position,
            self.window_start,
            self.window_end,
            expected,
            self.actual_queue,
            self.actual_class
        )
    }
}

/// How the trace capture ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReapStatus {
    /// Every expected completion arrived with success status
    #[default]
    Complete,
    /// Every expected completion arrived, some with an error status
    HardwareStatus { failed_entries: u32, first_status: u16 },
    /// The capture timed out; the trace is partial
    Timeout {
        expected: u32,
        reaped: u32,
        waited_ms: u64,
    },
}

impl ReapStatus {
    /// Status of a capture that returned normally.
    pub fn from_outcome(outcome: &ReapOutcome) -> Self {
        if outcome.hardware_error {
            ReapStatus::HardwareStatus {
                failed_entries: outcome.failed_entries,
                first_status: outcome.first_status.unwrap_or_default(),
            }
        } else {
            ReapStatus::Complete
        }
    }

    /// Status of a capture that failed, if the failure still leaves a trace to verify.
    pub fn from_error(error: &QueueError) -> Option<Self> {
        match *error {
            QueueError::Timeout {
                expected,
                reaped,
                waited_ms,
                ..
            } => Some(ReapStatus::Timeout {
                expected,
                reaped,
                waited_ms,
            }),
            QueueError::HardwareStatus {
                failed_entries,
                first_status,
            } => Some(ReapStatus::HardwareStatus {
                failed_entries,
                first_status,
            }),
            _ => None,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, ReapStatus::Complete)
    }
}

/// Outcome of verifying one arbitration trace.
///
/// `Σ(matched + mismatched) + unclassified == reaped` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub strategy: VerificationStrategy,
    pub order: PriorityOrder,
    /// Indexed by [`PriorityClass::as_index`]
    tallies: [ClassTally; 4],
    /// Positions past the strict verifier's cycle limit
    pub unclassified: u32,
    /// Entries in the verified trace
    pub reaped: u32,
    /// Full weighted cycles classified by the strict verifier
    pub completed_cycles: u32,
    /// Cycle limit applied by the strict verifier, `None` if unlimited
    pub cycle_limit: Option<u32>,
    pub mismatches: Vec<Mismatch>,
    pub reap_status: ReapStatus,
}

impl VerificationResult {
    pub(crate) fn new(strategy: VerificationStrategy, order: PriorityOrder, reaped: u32) -> Self {
        Self {
            strategy,
            order,
            tallies: [ClassTally::default(); 4],
            unclassified: 0,
            reaped,
            completed_cycles: 0,
            cycle_limit: None,
            mismatches: Vec::new(),
            reap_status: ReapStatus::Complete,
        }
    }

    pub(crate) fn record_match(&mut self, class: PriorityClass) {
        if let Some(tally) = self.tallies.get_mut(class.as_index()) {
            tally.matched = tally.matched.saturating_add(1);
        }
    }

    pub(crate) fn record_mismatch(&mut self, counted_under: PriorityClass, mismatch: Mismatch) {
        if let Some(tally) = self.tallies.get_mut(counted_under.as_index()) {
            tally.mismatched = tally.mismatched.saturating_add(1);
        }
        self.mismatches.push(mismatch);
    }

    /// Attach the capture status.
    #[must_use]
    pub fn with_reap_status(mut self, reap_status: ReapStatus) -> Self {
        self.reap_status = reap_status;
        self
    }

    /// Counts for `class`.
    pub fn tally(&self, class: PriorityClass) -> ClassTally {
        self.tallies
            .get(class.as_index())
            .copied()
            .unwrap_or_default()
    }

    pub fn matched(&self, class: PriorityClass) -> u32 {
        self.tally(class).matched
    }

    pub fn mismatched(&self, class: PriorityClass) -> u32 {
        self.tally(class).mismatched
    }

    /// Mismatches across every class.
    pub fn total_mismatches(&self) -> u32 {
        self.tallies
            .iter()
            .map(|t| t.mismatched)
            .fold(0u32, u32::saturating_add)
    }

    /// Positions that were classified.
    pub fn classified(&self) -> u32 {
        self.tallies
            .iter()
            .map(ClassTally::total)
            .fold(0u32, u32::saturating_add)
    }

    /// True when no position mismatched and the capture completed cleanly.
    pub fn passed(&self) -> bool {
        self.total_mismatches() == 0 && self.reap_status.is_complete()
    }

    /// Turn a failing judgment into an error.
    ///
    /// A timeout takes precedence over mismatches, which take precedence
    /// over hardware status failures.
    ///
    /// # Errors
    ///
    /// - `QueueError::Timeout` if the capture timed out
    /// - `ArbitrationError::Mismatch` if any position mismatched
    /// - `QueueError::HardwareStatus` if completions reported error status
    pub fn into_result(self) -> Result<Self, ConformanceError> {
        if let ReapStatus::Timeout {
            expected,
            reaped,
            waited_ms,
        } = self.reap_status
        {
            return Err(QueueError::timeout(None, expected, reaped, waited_ms).into());
        }
        if self.total_mismatches() > 0 {
            return Err(ArbitrationError::mismatch(
                self.mismatched(PriorityClass::Urgent),
                self.mismatched(PriorityClass::High),
                self.mismatched(PriorityClass::Medium),
                self.mismatched(PriorityClass::Low),
            )
            .into());
        }
        if let ReapStatus::HardwareStatus {
            failed_entries,
            first_status,
        } = self.reap_status
        {
            return Err(QueueError::hardware_status(failed_entries, first_status).into());
        }
        Ok(self)
    }

    /// Counter table for logs and reports.
    pub fn summary(&self) -> String {
        let verdict = if self.passed() { "PASS" } else { "FAIL" };
        let mut out = format!(
            "{} arbitration check ({}): {verdict}\n",
            self.strategy, self.order
        );
        out.push_str(&format!("{:<8} {:>8} {:>10}\n", "class", "matched", "mismatched"));
        for class in PriorityClass::ALL {
            let tally = self.tally(class);
            out.push_str(&format!(
                "{:<8} {:>8} {:>10}\n",
                class.to_string(),
                tally.matched,
                tally.mismatched
            ));
        }
        out.push_str(&format!(
            "reaped={} unclassified={} cycles={} reap={:?}",
            self.reaped, self.unclassified, self.completed_cycles, self.reap_status
        ));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::compute_order;

    fn mismatch_at(position: u32) -> Mismatch {
        Mismatch {
            position,
            window_start: position,
            window_end: position,
            expected: Some(PriorityClass::High),
            actual_queue: 1,
            actual_class: PriorityClass::Low,
        }
    }

    #[test]
    fn test_tallies() {
        let mut result = VerificationResult::new(VerificationStrategy::Strict, compute_order(2, 1, 0), 3);
        result.record_match(PriorityClass::High);
        result.record_match(PriorityClass::High);
        result.record_mismatch(PriorityClass::High, mismatch_at(3));
        assert_eq!(
            result.tally(PriorityClass::High),
            ClassTally {
                matched: 2,
                mismatched: 1
            }
        );
        assert_eq!(result.classified(), 3);
        assert_eq!(result.total_mismatches(), 1);
        assert!(!result.passed());
    }

    #[test]
    fn test_into_result_precedence() {
        let mut result = VerificationResult::new(VerificationStrategy::Strict, compute_order(0, 0, 0), 1);
        result.record_mismatch(PriorityClass::Urgent, mismatch_at(1));
        let timed_out = result.clone().with_reap_status(ReapStatus::Timeout {
            expected: 4,
            reaped: 1,
            waited_ms: 10,
        });
        assert!(matches!(
            timed_out.into_result(),
            Err(ConformanceError::Queue(QueueError::Timeout { .. }))
        ));
        assert!(matches!(
            result.into_result(),
            Err(ConformanceError::Arbitration(ArbitrationError::Mismatch {
                urgent: 1,
                ..
            }))
        ));
    }

    #[test]
    fn test_hardware_status_fails_clean_trace() {
        let result = VerificationResult::new(VerificationStrategy::Relaxed, compute_order(0, 0, 0), 0)
            .with_reap_status(ReapStatus::HardwareStatus {
                failed_entries: 1,
                first_status: 2,
            });
        assert!(!result.passed());
        assert!(matches!(
            result.into_result(),
            Err(ConformanceError::Queue(QueueError::HardwareStatus { .. }))
        ));
    }

    #[test]
    fn test_reap_status_from_error() {
        let status = ReapStatus::from_error(&QueueError::timeout(None, 8, 3, 10_000));
        assert_eq!(
            status,
            Some(ReapStatus::Timeout {
                expected: 8,
                reaped: 3,
                waited_ms: 10_000
            })
        );
        assert_eq!(ReapStatus::from_error(&QueueError::invalid_queue(9, 4)), None);
    }

    #[test]
    fn test_summary_lists_every_class() {
        let result = VerificationResult::new(VerificationStrategy::Strict, compute_order(2, 1, 0), 0);
        let summary = result.summary();
        assert!(summary.starts_with("strict arbitration check (High > Medium > Low): PASS"));
        for class in PriorityClass::ALL {
            assert!(summary.contains(&class.to_string()));
        }
    }

    #[test]
    fn test_mismatch_display() {
        assert_eq!(
            mismatch_at(7).to_string(),
            "position 7 (window 7..=7): expected High, got queue 1 (Low)"
        );
    }
}
