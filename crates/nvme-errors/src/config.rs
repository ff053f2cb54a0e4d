//! Configuration validation errors.

/// Invalid configuration value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A field is outside its allowed range.
    #[error("{field} = {value} is out of range [{min}, {max}]")]
    OutOfRange {
        /// Field name
        field: &'static str,
        /// Rejected value
        value: u64,
        /// Inclusive minimum
        min: u64,
        /// Inclusive maximum
        max: u64,
    },

    /// Two fields are inconsistent with each other.
    #[error("Inconsistent configuration: {0}")]
    Inconsistent(String),
}

impl ConfigError {
    /// Create an out of range error.
    pub fn out_of_range(field: &'static str, value: u64, min: u64, max: u64) -> Self {
        ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        }
    }

    /// Create an inconsistency error.
    pub fn inconsistent(msg: impl Into<String>) -> Self {
        ConfigError::Inconsistent(msg.into())
    }
}
