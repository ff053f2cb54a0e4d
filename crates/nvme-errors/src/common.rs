//! Common error types and utilities used across all conformance crates.
//!
//! This module provides the top-level error enum that wraps all sub-errors,
//! along with error classification, severity levels, and utility traits.

use core::fmt;

use crate::{ArbitrationError, ConfigError, QueueError};

/// Top-level error type that can wrap all conformance sub-errors.
#[derive(Debug, thiserror::Error)]
pub enum ConformanceError {
    /// Completion queue and reaping errors
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    /// Arbitration verification errors
    #[error("Arbitration error: {0}")]
    Arbitration(#[from] ArbitrationError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An error annotated with the step of a run that raised it.
    #[error("{context}: {source}")]
    Contextual {
        /// Where the error surfaced
        context: ErrorContext,
        /// The underlying error
        source: Box<ConformanceError>,
    },

    /// Free-form error
    #[error("{0}")]
    Other(String),
}

impl ConformanceError {
    /// Get the error category for classification.
    ///
    /// Context wrappers are looked through.
    pub fn category(&self) -> ErrorCategory {
        match self.root() {
            ConformanceError::Queue(_) => ErrorCategory::Queue,
            ConformanceError::Arbitration(_) => ErrorCategory::Arbitration,
            ConformanceError::Config(_) => ErrorCategory::Config,
            ConformanceError::Contextual { .. } | ConformanceError::Other(_) => {
                ErrorCategory::Other
            }
        }
    }

    /// Get the error severity level.
    pub fn severity(&self) -> ErrorSeverity {
        match self.root() {
            ConformanceError::Queue(e) => e.severity(),
            ConformanceError::Arbitration(e) => e.severity(),
            ConformanceError::Config(_)
            | ConformanceError::Contextual { .. }
            | ConformanceError::Other(_) => ErrorSeverity::Error,
        }
    }

    /// The innermost error beneath any context wrappers.
    pub fn root(&self) -> &ConformanceError {
        let mut err = self;
        while let ConformanceError::Contextual { source, .. } = err {
            err = source.as_ref();
        }
        err
    }

    /// Contexts attached to this error, outermost first.
    pub fn contexts(&self) -> impl Iterator<Item = &ErrorContext> + '_ {
        let mut next = Some(self);
        core::iter::from_fn(move || match next? {
            ConformanceError::Contextual { context, source } => {
                next = Some(source.as_ref());
                Some(context)
            }
            _ => {
                next = None;
                None
            }
        })
    }

    /// Create a free-form error with a message.
    pub fn other(msg: impl Into<String>) -> Self {
        ConformanceError::Other(msg.into())
    }
}

/// Error category for classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorCategory {
    /// Completion queue and reaping errors
    Queue = 0,
    /// Arbitration verification errors
    Arbitration = 1,
    /// Configuration errors
    Config = 2,
    /// Other errors
    Other = 255,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Queue => write!(f, "Queue"),
            ErrorCategory::Arbitration => write!(f, "Arbitration"),
            ErrorCategory::Config => write!(f, "Config"),
            ErrorCategory::Other => write!(f, "Other"),
        }
    }
}

/// Error severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ErrorSeverity {
    /// Informational, no action required
    Info = 0,
    /// Warning, results are usable but suspect
    Warning = 1,
    /// Error, operation failed
    Error = 2,
    /// Critical, device may be in unstable state
    Critical = 3,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// The step of a conformance run an error surfaced in, with the values
/// that identify it (queue ids, expected counts, strategy).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Step name, e.g. `"arbitration capture"`
    pub operation: &'static str,
    /// Identifying values in insertion order
    pub fields: Vec<(&'static str, String)>,
}

impl ErrorContext {
    /// Context for `operation` with no fields yet.
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            fields: Vec::new(),
        }
    }

    /// Record `key = value`.
    #[must_use]
    pub fn with(mut self, key: &'static str, value: impl fmt::Display) -> Self {
        self.fields.push((key, value.to_string()));
        self
    }

    /// First value recorded under `key`.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.operation)?;
        let mut sep = " (";
        for (key, value) in &self.fields {
            write!(f, "{sep}{key}={value}")?;
            sep = ", ";
        }
        if !self.fields.is_empty() {
            f.write_str(")")?;
        }
        Ok(())
    }
}

/// Attach an [`ErrorContext`] to a failed result without losing the typed
/// error underneath; see [`ConformanceError::root`].
pub trait ResultExt<T> {
    /// Wrap the error in `ctx`.
    ///
    /// # Errors
    ///
    /// Returns the original error wrapped in `ConformanceError::Contextual`.
    fn context(self, ctx: ErrorContext) -> Result<T, ConformanceError>;

    /// Like [`ResultExt::context`], building the context only on failure.
    ///
    /// # Errors
    ///
    /// Returns the original error wrapped in `ConformanceError::Contextual`.
    fn with_context<F>(self, ctx: F) -> Result<T, ConformanceError>
    where
        F: FnOnce() -> ErrorContext;
}

impl<T, E: Into<ConformanceError>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, ctx: ErrorContext) -> Result<T, ConformanceError> {
        self.with_context(|| ctx)
    }

    fn with_context<F>(self, ctx: F) -> Result<T, ConformanceError>
    where
        F: FnOnce() -> ErrorContext,
    {
        self.map_err(|e| ConformanceError::Contextual {
            context: ctx(),
            source: Box::new(e.into()),
        })
    }
}
