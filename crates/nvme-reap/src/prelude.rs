//! Common imports for reaping completions.

pub use crate::{
    ReapConfig, ReapConfigBuilder, ReapEngine, ReapOutcome, ReapSession, StatusScan, TraceCapture,
};
pub use nvme_errors::{QueueError, QueueResult};
pub use nvme_queue::{ArbitrationTrace, CompletionEntry, DeviceInterface, QueueId};
