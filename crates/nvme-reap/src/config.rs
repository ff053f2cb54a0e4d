//! Reap engine configuration.

use std::time::Duration;

use nvme_errors::ConfigError;
use serde::{Deserialize, Serialize};

/// Default sleep between poll rounds.
pub const DEFAULT_POLL_INTERVAL_US: u32 = 10;
/// Default idle timeout (one million 10 µs polls).
pub const DEFAULT_TIMEOUT_MS: u32 = 10_000;
/// Default buffer capacity, one maximum-size completion queue.
pub const DEFAULT_BUFFER_CAPACITY: u32 = 65_536;

const MAX_POLL_INTERVAL_US: u32 = 1_000_000;

/// Reap engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ReapConfig {
    /// Sleep between poll rounds, in microseconds.
    ///
    /// Default: 10 µs.
    pub poll_interval_us: u32,

    /// Idle timeout in milliseconds. The deadline is re-armed whenever a
    /// drain returns at least one entry.
    ///
    /// Default: 10 000 ms.
    pub timeout_ms: u32,

    /// Maximum number of entries a reap buffer may hold.
    ///
    /// Default: 65 536.
    pub buffer_capacity: u32,
}

impl ReapConfig {
    /// Create a configuration builder.
    #[must_use]
    pub fn builder() -> ReapConfigBuilder {
        ReapConfigBuilder::default()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a field is out of range or the poll interval is
    /// not shorter than the timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_POLL_INTERVAL_US).contains(&self.poll_interval_us) {
            return Err(ConfigError::out_of_range(
                "poll_interval_us",
                u64::from(self.poll_interval_us),
                1,
                u64::from(MAX_POLL_INTERVAL_US),
            ));
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::out_of_range(
                "timeout_ms",
                0,
                1,
                u64::from(u32::MAX),
            ));
        }
        if self.buffer_capacity == 0 {
            return Err(ConfigError::out_of_range(
                "buffer_capacity",
                0,
                1,
                u64::from(u32::MAX),
            ));
        }
        if u64::from(self.poll_interval_us) >= self.timeout_us() {
            return Err(ConfigError::inconsistent(format!(
                "poll interval {} us must be shorter than timeout {} ms",
                self.poll_interval_us, self.timeout_ms
            )));
        }
        Ok(())
    }

    /// Sleep between poll rounds.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_micros(u64::from(self.poll_interval_us))
    }

    /// Idle timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.timeout_ms))
    }

    /// Idle timeout in microseconds.
    #[must_use]
    pub fn timeout_us(&self) -> u64 {
        u64::from(self.timeout_ms) * 1000
    }

    /// Number of idle polls that fit in the timeout.
    #[must_use]
    pub fn max_idle_polls(&self) -> u64 {
        self.timeout_us() / u64::from(self.poll_interval_us.max(1))
    }
}

impl Default for ReapConfig {
    fn default() -> Self {
        Self {
            poll_interval_us: DEFAULT_POLL_INTERVAL_US,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

/// Builder for [`ReapConfig`].
#[derive(Debug, Default)]
pub struct ReapConfigBuilder {
    config: ReapConfig,
}

impl ReapConfigBuilder {
    /// Set the poll interval in microseconds.
    #[must_use]
    pub fn poll_interval_us(mut self, us: u32) -> Self {
        self.config.poll_interval_us = us;
        self
    }

    /// Set the idle timeout in milliseconds.
    #[must_use]
    pub fn timeout_ms(mut self, ms: u32) -> Self {
        self.config.timeout_ms = ms;
        self
    }

    /// Set the buffer capacity in entries.
    #[must_use]
    pub fn buffer_capacity(mut self, entries: u32) -> Self {
        self.config.buffer_capacity = entries;
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> Result<ReapConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ReapConfig::default();
        assert_eq!(config.poll_interval_us, 10);
        assert_eq!(config.timeout_ms, 10_000);
        assert_eq!(config.buffer_capacity, 65_536);
        assert_eq!(config.max_idle_polls(), 1_000_000);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_config_validation() {
        let zero_poll = ReapConfig::builder().poll_interval_us(0).build();
        assert!(matches!(
            zero_poll,
            Err(ConfigError::OutOfRange {
                field: "poll_interval_us",
                ..
            })
        ));

        let zero_timeout = ReapConfig::builder().timeout_ms(0).build();
        assert!(matches!(
            zero_timeout,
            Err(ConfigError::OutOfRange {
                field: "timeout_ms",
                ..
            })
        ));

        let zero_capacity = ReapConfig::builder().buffer_capacity(0).build();
        assert!(zero_capacity.is_err());

        let slow_poll = ReapConfig::builder()
            .poll_interval_us(5_000)
            .timeout_ms(5)
            .build();
        assert!(matches!(slow_poll, Err(ConfigError::Inconsistent(_))));
    }

    #[test]
    fn test_config_builder() -> Result<(), ConfigError> {
        let config = ReapConfig::builder()
            .poll_interval_us(50)
            .timeout_ms(20)
            .buffer_capacity(128)
            .build()?;
        assert_eq!(config.poll_interval(), Duration::from_micros(50));
        assert_eq!(config.timeout(), Duration::from_millis(20));
        assert_eq!(config.max_idle_polls(), 400);
        Ok(())
    }
}
