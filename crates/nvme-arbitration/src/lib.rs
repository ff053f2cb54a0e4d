//! Weighted round robin arbitration verification.
//!
//! Given the configured [`ArbitrationWeights`](nvme_queue::ArbitrationWeights),
//! the queue priority bindings and a captured
//! [`ArbitrationTrace`](nvme_queue::ArbitrationTrace), this crate reconstructs
//! the service order a conforming controller must follow and checks the
//! trace against it.
//!
//! - [`compute_order`] ranks the weighted classes (descending weight, ties
//!   High > Medium > Low)
//! - [`verify_arbitration`] runs the strict or relaxed strategy and returns
//!   a [`VerificationResult`] with per-class tallies and mismatch diagnostics
//! - [`ArbitrationRun`] captures a trace with a [`ReapEngine`](nvme_reap::ReapEngine)
//!   and verifies it in one call
//!
//! Mismatches are tallied over the whole trace and never raised one at a
//! time; [`VerificationResult::into_result`] turns a failing judgment into
//! an error.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod order;
pub mod prelude;
pub mod result;
pub mod run;
pub mod verifier;

pub use order::{PriorityOrder, compute_order, cycle_limit, min_outstanding_in_top_class, order_for};
pub use result::{ClassTally, Mismatch, ReapStatus, VerificationResult, VerificationStrategy};
pub use run::ArbitrationRun;
pub use verifier::verify_arbitration;
