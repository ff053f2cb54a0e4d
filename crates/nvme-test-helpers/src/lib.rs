//! Shared test utilities for NVMe conformance tooling.
//!
//! # Modules
//!
//! - [`mod@must`] - Unwrap helpers with good error messages and `#[track_caller]`
//! - [`mock`] - A simulated device interface with scripted completion delivery
//! - [`fixtures`] - Builders for correctly ordered weighted round robin traces
//! - [`logging`] - Test subscriber setup for `tracing` output
//! - [`prelude`] - Convenience re-exports
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! nvme-test-helpers = { workspace = true }
//! ```
//!
//! ```rust,ignore
//! use nvme_test_helpers::prelude::*;
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![allow(clippy::unwrap_used, clippy::panic)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod logging;
pub mod must;
pub mod prelude;

#[cfg(feature = "mock")]
#[cfg_attr(docsrs, doc(cfg(feature = "mock")))]
pub mod mock;

#[cfg(feature = "fixtures")]
#[cfg_attr(docsrs, doc(cfg(feature = "fixtures")))]
pub mod fixtures;

pub use logging::init_test_tracing;
pub use must::*;
