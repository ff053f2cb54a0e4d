//! Bounded completion-queue reaping.
//!
//! The [`ReapEngine`] repeatedly drains a completion queue through a
//! [`DeviceInterface`](nvme_queue::DeviceInterface), accumulating entries
//! into a caller-supplied buffer until the expected count is reached or an
//! idle deadline passes. Each drain that returns entries re-arms the
//! deadline; the engine sleeps a short fixed interval between poll rounds.
//!
//! After collection every entry's status is scanned. A nonzero status does
//! not stop the reap: it sets the outcome's `hardware_error` flag once the
//! expected count is otherwise satisfied.
//!
//! # Example
//!
//! ```rust,ignore
//! use nvme_reap::prelude::*;
//!
//! let mut engine = ReapEngine::new(device);
//! let mut buffer = Vec::new();
//! let outcome = engine.reap(1, 500, &mut buffer)?;
//! assert!(!outcome.hardware_error);
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod config;
pub mod engine;
pub mod prelude;
pub mod scan;
pub mod session;

pub use config::{ReapConfig, ReapConfigBuilder};
pub use engine::{ReapEngine, TraceCapture};
pub use scan::{ReapOutcome, StatusScan, scan_completions};
pub use session::ReapSession;
