//! Prelude module for convenient error handling imports.
//!
//! # Example
//!
//! ```
//! use nvme_errors::prelude::*;
//!
//! fn expect_complete(reaped: u32, expected: u32) -> Result<()> {
//!     if reaped < expected {
//!         return Err(QueueError::timeout(None, expected, reaped, 10_000).into());
//!     }
//!     Ok(())
//! }
//!
//! assert!(expect_complete(4, 4).is_ok());
//! ```

pub use crate::{
    QueueResult, Result,
    arbitration::ArbitrationError,
    common::{ConformanceError, ErrorCategory, ErrorContext, ErrorSeverity, ResultExt},
    config::ConfigError,
    queue::QueueError,
};

/// Build an [`ErrorContext`](crate::ErrorContext) from an operation name
/// and `key = value` pairs.
///
/// A bare identifier records a local of the same name.
///
/// # Example
///
/// ```
/// use nvme_errors::error_context;
///
/// let expected = 500;
/// let ctx = error_context!("reap", cq_id = 1, expected);
/// assert_eq!(ctx.to_string(), "reap (cq_id=1, expected=500)");
/// ```
#[macro_export]
macro_rules! error_context {
    (@value $key:ident) => { $key };
    (@value $key:ident, $value:expr) => { $value };
    ($operation:expr $(, $key:ident $(= $value:expr)?)* $(,)?) => {
        $crate::ErrorContext::new($operation)
            $(.with(stringify!($key), $crate::error_context!(@value $key $(, $value)?)))*
    };
}
