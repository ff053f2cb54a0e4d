//! Queue-level data model for NVMe conformance tooling
//!
//! This crate provides the types shared by the reap engine and the
//! arbitration verifier, plus the collaborator traits they consume:
//!
//! - [`CompletionEntry`]: one reaped completion with its decoded status field
//! - [`PriorityClass`]: the queue-priority tier a submission queue is bound to
//! - [`ArbitrationWeights`]: the Arbitration feature settings (0's-based weights)
//! - [`ArbitrationMechanism`]: the controller configuration AMS selection
//! - [`ArbitrationTrace`]: completions in the order they were drained
//! - [`DeviceInterface`]: the transport that drains completion queues
//! - [`QueueRegistry`]: per-queue priority bindings and outstanding counts

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]
#![warn(missing_docs)]

pub mod completion;
pub mod device;
pub mod prelude;
pub mod priority;
pub mod registry;
pub mod trace;

pub use completion::CompletionEntry;
pub use device::DeviceInterface;
pub use priority::{ArbitrationMechanism, ArbitrationWeights, PriorityClass};
pub use registry::{QueueBinding, QueueRegistry, StaticQueueRegistry};
pub use trace::ArbitrationTrace;

/// Queue identifier. Submission and completion queues are paired one to one,
/// so the same id names both halves; id 0 is the admin queue.
pub type QueueId = u16;

/// Admin queue id.
pub const ADMIN_QUEUE_ID: QueueId = 0;

/// Size of one completion queue entry in bytes.
pub const CQ_ENTRY_SIZE: usize = 16;
