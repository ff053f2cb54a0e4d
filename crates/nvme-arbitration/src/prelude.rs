//! Common imports for arbitration checks.

pub use crate::{
    ArbitrationRun, ClassTally, Mismatch, PriorityOrder, ReapStatus, VerificationResult,
    VerificationStrategy, compute_order, min_outstanding_in_top_class, verify_arbitration,
};
pub use nvme_queue::{
    ArbitrationMechanism, ArbitrationTrace, ArbitrationWeights, PriorityClass, QueueRegistry,
    StaticQueueRegistry,
};
pub use nvme_reap::{ReapConfig, ReapEngine};
