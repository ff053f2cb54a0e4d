//! Completion traces.

use serde::{Deserialize, Serialize};

use crate::{CompletionEntry, QueueId};

/// Completions in the order they were drained.
///
/// Arrival order is taken to be service order. A trace is consumed by the
/// arbitration verifier and never reordered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArbitrationTrace {
    entries: Vec<CompletionEntry>,
}

impl ArbitrationTrace {
    /// Create an empty trace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty trace with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Append one completion.
    pub fn push(&mut self, entry: CompletionEntry) {
        self.entries.push(entry);
    }

    /// Append a drained batch, keeping its order.
    pub fn extend_from_slice(&mut self, batch: &[CompletionEntry]) {
        self.entries.extend_from_slice(batch);
    }

    /// Number of completions.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing was captured.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Completions as a slice.
    #[inline]
    pub fn entries(&self) -> &[CompletionEntry] {
        &self.entries
    }

    /// Iterate over completions in drain order.
    pub fn iter(&self) -> core::slice::Iter<'_, CompletionEntry> {
        self.entries.iter()
    }

    /// Iterate with 1-based positions.
    pub fn positions(&self) -> impl Iterator<Item = (u32, &CompletionEntry)> + '_ {
        (1u32..).zip(self.entries.iter())
    }

    /// Number of completions owned by `queue_id`.
    pub fn count_for_queue(&self, queue_id: QueueId) -> usize {
        self.entries.iter().filter(|e| e.sq_id == queue_id).count()
    }

    /// Number of completions with a nonzero status code.
    pub fn failed_count(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_success()).count()
    }

    /// Discard all captured completions.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Consume the trace, returning its entries.
    pub fn into_entries(self) -> Vec<CompletionEntry> {
        self.entries
    }
}

impl From<Vec<CompletionEntry>> for ArbitrationTrace {
    fn from(entries: Vec<CompletionEntry>) -> Self {
        Self { entries }
    }
}

impl FromIterator<CompletionEntry> for ArbitrationTrace {
    fn from_iter<I: IntoIterator<Item = CompletionEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ArbitrationTrace {
    type Item = &'a CompletionEntry;
    type IntoIter = core::slice::Iter<'a, CompletionEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positions_are_one_based() {
        let trace: ArbitrationTrace = (0..3).map(|i| CompletionEntry::success(1, i)).collect();
        let positions: Vec<u32> = trace.positions().map(|(pos, _)| pos).collect();
        assert_eq!(positions, vec![1, 2, 3]);
    }

    #[test]
    fn test_counts() {
        let mut trace = ArbitrationTrace::new();
        trace.push(CompletionEntry::success(1, 0));
        trace.push(CompletionEntry::success(2, 0).with_status(0x2));
        trace.extend_from_slice(&[CompletionEntry::success(1, 1)]);
        assert_eq!(trace.len(), 3);
        assert_eq!(trace.count_for_queue(1), 2);
        assert_eq!(trace.failed_count(), 1);
    }
}
