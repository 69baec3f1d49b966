use std::time::Duration;

use crate::protocol::constants::{DEFAULT_MAX_LINE_LENGTH, DEFAULT_POOL_MAX_IDLE};
use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Reconnect transparently when sending on a dead transport
    pub auto_reconnect: bool,

    /// Maximum accepted length of a start-line or header line
    pub max_line_length: usize,

    /// How many idle payload buffers the pool keeps around
    pub pool_max_idle: usize,

    /// How long dispose waits for the read task to exit
    pub shutdown_grace: Duration,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        ListenerConfig {
            auto_reconnect: false,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            pool_max_idle: DEFAULT_POOL_MAX_IDLE,
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

impl ListenerConfig {
    /// Create config builder
    pub fn builder() -> ListenerConfigBuilder {
        ListenerConfigBuilder::new()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_line_length < 64 {
            return Err(Error::config("Max line length must be at least 64"));
        }

        if self.shutdown_grace.is_zero() {
            return Err(Error::config("Shutdown grace must be non-zero"));
        }

        Ok(())
    }
}

/// Builder for ListenerConfig
pub struct ListenerConfigBuilder {
    config: ListenerConfig,
}

impl ListenerConfigBuilder {
    /// Create new builder
    pub fn new() -> Self {
        ListenerConfigBuilder {
            config: ListenerConfig::default(),
        }
    }

    /// Enable auto-reconnect
    pub fn auto_reconnect(mut self, enabled: bool) -> Self {
        self.config.auto_reconnect = enabled;
        self
    }

    /// Set the header line cap
    pub fn max_line_length(mut self, length: usize) -> Self {
        self.config.max_line_length = length;
        self
    }

    /// Set the pool idle bound
    pub fn pool_max_idle(mut self, count: usize) -> Self {
        self.config.pool_max_idle = count;
        self
    }

    /// Set the dispose grace period
    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.config.shutdown_grace = grace;
        self
    }

    /// Build configuration
    pub fn build(self) -> Result<ListenerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ListenerConfigBuilder {
    fn default() -> Self {
        ListenerConfigBuilder::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(ListenerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = ListenerConfig::builder()
            .auto_reconnect(true)
            .max_line_length(4096)
            .build()
            .unwrap();
        assert!(config.auto_reconnect);
        assert_eq!(config.max_line_length, 4096);
    }

    #[test]
    fn test_rejects_tiny_line_cap() {
        let result = ListenerConfig::builder().max_line_length(16).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_zero_grace() {
        let result = ListenerConfig::builder()
            .shutdown_grace(Duration::ZERO)
            .build();
        assert!(result.is_err());
    }
}
