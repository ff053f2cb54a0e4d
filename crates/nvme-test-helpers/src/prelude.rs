//! Convenience re-exports for common test utilities.
//!
//! ```rust,ignore
//! use nvme_test_helpers::prelude::*;
//! ```

pub use crate::logging::init_test_tracing;
pub use crate::must::{must, must_err, must_some, must_with};

#[cfg(feature = "mock")]
pub use crate::mock::{DrainCall, SimulatedDevice};

#[cfg(feature = "fixtures")]
pub use crate::fixtures::{
    FIXTURE_QUEUE_COUNT, HIGH_QUEUE, LOW_QUEUE, MEDIUM_QUEUE, URGENT_QUEUE, WrrTraceBuilder,
    WrrTraceFixture, queue_for,
};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;
