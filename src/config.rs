//! Configuration Module
//!
//! This module defines the batcher settings and the file configuration of the
//! demo binary. Batcher settings are validated when a `Batcher` is built;
//! the file configuration is loaded from TOML and parsed using serde.

use crate::error::ConfigError;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
///
/// # Example TOML
/// ```toml
/// [batcher]
/// max_size = 3
/// max_time_ms = 100
/// min_time_ms = 0
///
/// [demo]
/// items = 10
/// cancel_index = 4
/// handler_latency_ms = 25
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub batcher: BatcherConfig,
    #[serde(default)]
    pub demo: DemoConfig,
}

/// Batching configuration
///
/// Controls when a group closes and how long it dwells before flushing.
///
/// # Fields
/// - `max_size`: Group size that closes the group immediately (must be > 0)
/// - `max_time_ms`: Maximum time a group stays open after its first item arrives
/// - `min_time_ms`: Minimum time from the first item's arrival before a closed
///   group is handed to the flush handler
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BatcherConfig {
    pub max_size: usize,
    pub max_time_ms: u64,
    #[serde(default)]
    pub min_time_ms: u64,
}

impl BatcherConfig {
    pub fn new(max_size: usize, max_time_ms: u64) -> Self {
        Self {
            max_size,
            max_time_ms,
            min_time_ms: 0,
        }
    }

    pub fn with_min_time_ms(mut self, min_time_ms: u64) -> Self {
        self.min_time_ms = min_time_ms;
        self
    }

    pub fn max_time(&self) -> Duration {
        Duration::from_millis(self.max_time_ms)
    }

    pub fn min_time(&self) -> Duration {
        Duration::from_millis(self.min_time_ms)
    }

    /// Check the settings that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_size == 0 {
            return Err(ConfigError::ZeroMaxSize);
        }
        Ok(())
    }
}

/// Settings for the demo binary
///
/// # Fields
/// - `items`: How many integers to enqueue
/// - `cancel_index`: Index of an item to cancel right after enqueueing it
/// - `handler_latency_ms`: Simulated cost of one flush
#[derive(Debug, Clone, Deserialize)]
pub struct DemoConfig {
    pub items: u64,
    pub cancel_index: Option<u64>,
    pub handler_latency_ms: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            items: 10,
            cancel_index: None,
            handler_latency_ms: 0,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Returns
    /// * `Ok(Config)` if the file was read, parsed and validated
    /// * `Err` if the file couldn't be read, the TOML is invalid or the
    ///   batcher settings are out of range
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.batcher.validate()?;
        Ok(config)
    }
}
