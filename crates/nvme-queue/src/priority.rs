//! Priority classes and arbitration settings.
//!
//! Submission queues are bound to one [`PriorityClass`] when they are
//! created. With weighted round robin arbitration the controller services
//! Urgent queues first and exhaustively, then cycles through the High,
//! Medium and Low classes, granting each `weight + 1` consecutive commands
//! per cycle (weights are 0's-based).

use core::fmt;

use serde::{Deserialize, Serialize};

/// Queue priority tier, encoded as in the Create I/O Submission Queue QPRIO field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PriorityClass {
    /// Serviced before every weighted class, without weighting
    Urgent = 0,
    /// High weighted class
    High = 1,
    /// Medium weighted class
    Medium = 2,
    /// Low weighted class
    Low = 3,
}

impl PriorityClass {
    /// All classes in static priority order.
    pub const ALL: [PriorityClass; 4] = [
        PriorityClass::Urgent,
        PriorityClass::High,
        PriorityClass::Medium,
        PriorityClass::Low,
    ];

    /// The three weighted classes in static priority order.
    pub const WEIGHTED: [PriorityClass; 3] =
        [PriorityClass::High, PriorityClass::Medium, PriorityClass::Low];

    /// Decode a QPRIO field value.
    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(PriorityClass::Urgent),
            1 => Some(PriorityClass::High),
            2 => Some(PriorityClass::Medium),
            3 => Some(PriorityClass::Low),
            _ => None,
        }
    }

    /// QPRIO field value.
    #[inline]
    pub fn bits(self) -> u8 {
        self as u8
    }

    /// Index for per-class arrays (0-3).
    #[inline]
    pub fn as_index(self) -> usize {
        self as usize
    }

    /// True for High, Medium and Low.
    #[inline]
    pub fn is_weighted(self) -> bool {
        !matches!(self, PriorityClass::Urgent)
    }
}

impl fmt::Display for PriorityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriorityClass::Urgent => write!(f, "Urgent"),
            PriorityClass::High => write!(f, "High"),
            PriorityClass::Medium => write!(f, "Medium"),
            PriorityClass::Low => write!(f, "Low"),
        }
    }
}

/// Arbitration burst value meaning "no limit".
pub const ARBITRATION_BURST_UNLIMITED: u8 = 0b111;

/// Arbitration feature settings, read once before a verification run.
///
/// All weights are 0's-based: a stored weight `w` grants `w + 1`
/// consecutive service opportunities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ArbitrationWeights {
    /// Arbitration burst, as a power of two (`0b111` = no limit)
    pub urgent_burst: u8,
    /// High priority weight
    pub high_weight: u8,
    /// Medium priority weight
    pub medium_weight: u8,
    /// Low priority weight
    pub low_weight: u8,
}

impl ArbitrationWeights {
    /// Create weights with an arbitration burst of zero.
    pub fn new(high_weight: u8, medium_weight: u8, low_weight: u8) -> Self {
        Self {
            urgent_burst: 0,
            high_weight,
            medium_weight,
            low_weight,
        }
    }

    /// Set the arbitration burst (only the low three bits are kept).
    #[must_use]
    pub fn with_burst(mut self, urgent_burst: u8) -> Self {
        self.urgent_burst = urgent_burst & 0x7;
        self
    }

    /// Decode Get Features (Arbitration) completion dword 0.
    ///
    /// HPW is bits 31:24, MPW 23:16, LPW 15:8 and AB 2:0.
    pub fn from_feature_dword(dword: u32) -> Self {
        let [ab, lpw, mpw, hpw] = dword.to_le_bytes();
        Self {
            urgent_burst: ab & 0x7,
            high_weight: hpw,
            medium_weight: mpw,
            low_weight: lpw,
        }
    }

    /// Encode as Set Features (Arbitration) command dword 11.
    pub fn to_feature_dword(&self) -> u32 {
        u32::from_le_bytes([
            self.urgent_burst & 0x7,
            self.low_weight,
            self.medium_weight,
            self.high_weight,
        ])
    }

    /// Stored (0's-based) weight of a weighted class, `None` for Urgent.
    pub fn weight(&self, class: PriorityClass) -> Option<u8> {
        match class {
            PriorityClass::Urgent => None,
            PriorityClass::High => Some(self.high_weight),
            PriorityClass::Medium => Some(self.medium_weight),
            PriorityClass::Low => Some(self.low_weight),
        }
    }

    /// Consecutive commands a weighted class is serviced per cycle (`weight + 1`).
    /// Urgent has no window and reports zero.
    pub fn service_slots(&self, class: PriorityClass) -> u32 {
        self.weight(class).map_or(0, |w| u32::from(w) + 1)
    }

    /// Commands per full weighted cycle.
    pub fn cycle_length(&self) -> u32 {
        PriorityClass::WEIGHTED
            .iter()
            .map(|&class| self.service_slots(class))
            .sum()
    }

    /// Maximum commands fetched from one queue at a time, `None` when unlimited.
    pub fn burst_limit(&self) -> Option<u32> {
        let burst = self.urgent_burst & 0x7;
        if burst == ARBITRATION_BURST_UNLIMITED {
            None
        } else {
            Some(1u32 << burst)
        }
    }
}

impl fmt::Display for ArbitrationWeights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HPW={}, MPW={}, LPW={}, AB={}",
            self.high_weight, self.medium_weight, self.low_weight, self.urgent_burst
        )
    }
}

/// Controller configuration AMS field shift.
pub const CC_AMS_SHIFT: u32 = 11;
const CC_AMS_MASK: u32 = 0x7 << CC_AMS_SHIFT;
const CAP_AMS_SHIFT: u32 = 17;

/// Arbitration mechanism selected in the controller configuration (CC.AMS, bits 13:11).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ArbitrationMechanism {
    /// Plain round robin
    RoundRobin = 0,
    /// Weighted round robin with urgent priority class
    WeightedRoundRobinUrgent = 1,
    /// Vendor specific
    VendorSpecific = 7,
}

impl ArbitrationMechanism {
    /// Decode the AMS field of a controller configuration value.
    pub fn from_cc(cc: u32) -> Option<Self> {
        match (cc & CC_AMS_MASK) >> CC_AMS_SHIFT {
            0 => Some(ArbitrationMechanism::RoundRobin),
            1 => Some(ArbitrationMechanism::WeightedRoundRobinUrgent),
            7 => Some(ArbitrationMechanism::VendorSpecific),
            _ => None,
        }
    }

    /// Return `cc` with its AMS field replaced by this mechanism.
    pub fn apply_to_cc(self, cc: u32) -> u32 {
        (cc & !CC_AMS_MASK) | (u32::from(self as u8) << CC_AMS_SHIFT)
    }

    /// Check the controller capabilities AMS bits (CAP bits 18:17).
    /// Round robin is always supported.
    pub fn supported_by_cap(self, cap: u64) -> bool {
        let ams = (cap >> CAP_AMS_SHIFT) & 0x3;
        match self {
            ArbitrationMechanism::RoundRobin => true,
            ArbitrationMechanism::WeightedRoundRobinUrgent => ams & 0x1 != 0,
            ArbitrationMechanism::VendorSpecific => ams & 0x2 != 0,
        }
    }
}
