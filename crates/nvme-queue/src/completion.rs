//! Completion queue entries.
//!
//! A completion entry is immutable once produced by the device interface.
//! The raw 16-bit status field packs the phase tag into bit 0 and the
//! status proper into bits 15:1:
//!
//! ```text
//!  15   14   13:12  11:9  8:1  0
//! DNR  More  CRD    SCT   SC   P
//! ```

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::{CQ_ENTRY_SIZE, QueueId};

/// One reaped completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompletionEntry {
    /// Submission queue that generated this entry (the owning queue).
    pub sq_id: QueueId,
    /// Identifier of the command that completed.
    pub command_id: u16,
    /// Command specific result, dword 0.
    pub result: u32,
    /// Status field without the phase tag (raw bits 15:1). Zero is success.
    pub status_code: u16,
    /// Phase tag.
    pub phase: bool,
    /// Submission queue head pointer reported by the controller.
    pub sq_head: u16,
}

impl CompletionEntry {
    /// Create a successful completion for `command_id` on `sq_id`.
    pub fn success(sq_id: QueueId, command_id: u16) -> Self {
        Self {
            sq_id,
            command_id,
            result: 0,
            status_code: 0,
            phase: true,
            sq_head: 0,
        }
    }

    /// Build an entry from the raw completion fields.
    pub fn from_raw(result: u32, sq_head: u16, sq_id: QueueId, command_id: u16, status: u16) -> Self {
        Self {
            sq_id,
            command_id,
            result,
            status_code: status >> 1,
            phase: status & 0x1 != 0,
            sq_head,
        }
    }

    /// Decode a 16-byte little-endian completion queue entry.
    pub fn from_bytes(bytes: &[u8; CQ_ENTRY_SIZE]) -> Self {
        let [r0, r1, r2, r3, _, _, _, _, h0, h1, q0, q1, c0, c1, s0, s1] = *bytes;
        Self::from_raw(
            u32::from_le_bytes([r0, r1, r2, r3]),
            u16::from_le_bytes([h0, h1]),
            u16::from_le_bytes([q0, q1]),
            u16::from_le_bytes([c0, c1]),
            u16::from_le_bytes([s0, s1]),
        )
    }

    /// Encode as a 16-byte little-endian completion queue entry.
    pub fn to_bytes(&self) -> [u8; CQ_ENTRY_SIZE] {
        let [r0, r1, r2, r3] = self.result.to_le_bytes();
        let [h0, h1] = self.sq_head.to_le_bytes();
        let [q0, q1] = self.sq_id.to_le_bytes();
        let [c0, c1] = self.command_id.to_le_bytes();
        let [s0, s1] = self.raw_status().to_le_bytes();
        [r0, r1, r2, r3, 0, 0, 0, 0, h0, h1, q0, q1, c0, c1, s0, s1]
    }

    /// Set the status field (without phase).
    #[must_use]
    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = status_code & 0x7fff;
        self
    }

    /// Set the command specific result.
    #[must_use]
    pub fn with_result(mut self, result: u32) -> Self {
        self.result = result;
        self
    }

    /// Set the reported submission queue head pointer.
    #[must_use]
    pub fn with_sq_head(mut self, sq_head: u16) -> Self {
        self.sq_head = sq_head;
        self
    }

    /// Raw 16-bit status field including the phase tag.
    pub fn raw_status(&self) -> u16 {
        (self.status_code << 1) | u16::from(self.phase)
    }

    /// True when the controller reported success.
    #[inline]
    pub fn is_success(&self) -> bool {
        self.status_code == 0
    }

    /// Status code (SC), raw bits 8:1.
    pub fn status_code_value(&self) -> u8 {
        (self.status_code & 0xff) as u8
    }

    /// Status code type (SCT), raw bits 11:9.
    pub fn status_code_type(&self) -> u8 {
        ((self.status_code >> 8) & 0x7) as u8
    }

    /// More information available in the error log.
    pub fn more(&self) -> bool {
        (self.status_code >> 13) & 0x1 != 0
    }

    /// Do not retry.
    pub fn do_not_retry(&self) -> bool {
        (self.status_code >> 14) & 0x1 != 0
    }
}

impl fmt::Display for CompletionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cmd_id={}, dw0={:#x}, phase_bit={}, sq_head_ptr={:#x}, sq_id={}, sts={:#x}",
            self.command_id,
            self.result,
            u8::from(self.phase),
            self.sq_head,
            self.sq_id,
            self.status_code
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_splits_phase() {
        let entry = CompletionEntry::from_raw(0x10, 0x20, 3, 7, 0x0005);
        assert!(entry.phase);
        assert_eq!(entry.status_code, 0x2);
        assert!(!entry.is_success());
        assert_eq!(entry.raw_status(), 0x0005);
    }

    #[test]
    fn test_status_fields() {
        // SCT=0x2 (media error), SC=0x81, DNR set
        let status_code = (1 << 14) | (0x2 << 8) | 0x81;
        let entry = CompletionEntry::success(1, 1).with_status(status_code);
        assert_eq!(entry.status_code_type(), 0x2);
        assert_eq!(entry.status_code_value(), 0x81);
        assert!(entry.do_not_retry());
        assert!(!entry.more());
    }

    #[test]
    fn test_bytes_layout() {
        let entry = CompletionEntry::from_raw(0xdead_beef, 0x0102, 4, 0x0a0b, 0x0001);
        let bytes = entry.to_bytes();
        assert_eq!(bytes[0..4], [0xef, 0xbe, 0xad, 0xde]);
        assert_eq!(bytes[8..10], [0x02, 0x01]);
        assert_eq!(bytes[10..12], [0x04, 0x00]);
        assert_eq!(bytes[12..14], [0x0b, 0x0a]);
        assert_eq!(bytes[14..16], [0x01, 0x00]);
        assert_eq!(CompletionEntry::from_bytes(&bytes), entry);
    }

    #[test]
    fn test_display_format() {
        let entry = CompletionEntry::success(2, 9).with_sq_head(0x10);
        assert_eq!(
            entry.to_string(),
            "cmd_id=9, dw0=0x0, phase_bit=1, sq_head_ptr=0x10, sq_id=2, sts=0x0"
        );
    }
}
