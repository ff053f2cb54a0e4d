//! Centralized error types for NVMe conformance tooling
//!
//! This crate provides the error taxonomy shared by the completion reaping
//! engine and the arbitration verifier.
//!
//! # Architecture
//!
//! The error system is organized into several modules:
//!
//! - [`common`]: Top-level error type, classification and context utilities
//! - [`queue`]: Completion-queue reaping errors (`InvalidQueue`, `Timeout`, `HardwareStatus`)
//! - [`arbitration`]: Arbitration verification errors (`Mismatch`)
//! - [`config`]: Configuration validation errors
//!
//! # Propagation
//!
//! - `InvalidQueue` and `Timeout` are terminal for the call that raised them.
//! - `HardwareStatus` is a flag on an otherwise complete reap; it never stops
//!   trace collection.
//! - Arbitration mismatches are tallied over a whole run and raised once.
//!
//! # Example
//!
//! ```
//! use nvme_errors::prelude::*;
//!
//! fn check_queue(queue_id: u16, queue_count: u16) -> Result<u16> {
//!     if queue_id > queue_count {
//!         return Err(QueueError::invalid_queue(queue_id, queue_count).into());
//!     }
//!     Ok(queue_id)
//! }
//!
//! assert!(check_queue(3, 4).is_ok());
//! assert!(check_queue(9, 4).is_err());
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod arbitration;
pub mod common;
pub mod config;
pub mod prelude;
pub mod queue;

pub use arbitration::ArbitrationError;
pub use common::{ConformanceError, ErrorCategory, ErrorContext, ErrorSeverity, ResultExt};
pub use config::ConfigError;
pub use queue::QueueError;

/// A specialized `Result` type for conformance operations.
pub type Result<T> = std::result::Result<T, ConformanceError>;

/// A specialized `Result` type for reap operations.
pub type QueueResult<T> = std::result::Result<T, QueueError>;
