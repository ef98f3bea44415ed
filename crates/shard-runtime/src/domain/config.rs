//! # Runtime Configuration
//!
//! Topology and thread settings for the shard runtime.

use std::env;

use serde::{Deserialize, Serialize};

use super::errors::DispatchError;

/// Minimum shard count.
pub const MIN_SHARD_COUNT: u16 = 1;

/// Maximum shard count.
pub const MAX_SHARD_COUNT: u16 = 1024;

/// Default prefix for shard thread names.
pub const DEFAULT_THREAD_PREFIX: &str = "shard";

/// Shard runtime configuration.
///
/// The shard set is fixed for the lifetime of the runtime built from it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Total number of shards (one thread each).
    pub shard_count: u16,
    /// Shard threads are named `{thread_name_prefix}-{shard_id}`.
    pub thread_name_prefix: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            shard_count: default_shard_count(),
            thread_name_prefix: DEFAULT_THREAD_PREFIX.to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Create config for testing.
    pub fn for_testing() -> Self {
        Self {
            shard_count: 4,
            thread_name_prefix: "test-shard".to_string(),
        }
    }

    /// Same config with a different shard count.
    #[must_use]
    pub fn with_shard_count(mut self, shard_count: u16) -> Self {
        self.shard_count = shard_count;
        self
    }

    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `SHARD_COUNT`: number of shards (default: one per CPU)
    /// - `SHARD_THREAD_PREFIX`: thread name prefix (default: shard)
    pub fn from_env() -> Self {
        Self {
            shard_count: env::var("SHARD_COUNT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_shard_count),
            thread_name_prefix: env::var("SHARD_THREAD_PREFIX")
                .unwrap_or_else(|_| DEFAULT_THREAD_PREFIX.to_string()),
        }
    }

    /// Check topology bounds.
    pub fn validate(&self) -> Result<(), DispatchError> {
        if !(MIN_SHARD_COUNT..=MAX_SHARD_COUNT).contains(&self.shard_count) {
            return Err(DispatchError::Config(format!(
                "shard_count {} outside {}..={}",
                self.shard_count, MIN_SHARD_COUNT, MAX_SHARD_COUNT
            )));
        }
        if self.thread_name_prefix.is_empty() {
            return Err(DispatchError::Config(
                "thread_name_prefix must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Thread name for a shard.
    pub fn thread_name(&self, shard_id: u16) -> String {
        format!("{}-{}", self.thread_name_prefix, shard_id)
    }
}

fn default_shard_count() -> u16 {
    num_cpus::get().clamp(MIN_SHARD_COUNT as usize, MAX_SHARD_COUNT as usize) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RuntimeConfig::default();
        assert!(config.shard_count >= MIN_SHARD_COUNT);
        assert_eq!(config.thread_name_prefix, "shard");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_testing_config() {
        let config = RuntimeConfig::for_testing();
        assert_eq!(config.shard_count, 4);
        assert_eq!(config.thread_name(2), "test-shard-2");
    }

    #[test]
    fn test_zero_shards_rejected() {
        let config = RuntimeConfig::for_testing().with_shard_count(0);
        assert!(matches!(config.validate(), Err(DispatchError::Config(_))));
    }

    #[test]
    fn test_too_many_shards_rejected() {
        let config = RuntimeConfig::for_testing().with_shard_count(MAX_SHARD_COUNT + 1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_prefix_rejected() {
        let mut config = RuntimeConfig::for_testing();
        config.thread_name_prefix.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serde() {
        let config = RuntimeConfig::for_testing();
        let json = serde_json::to_string(&config).unwrap();
        let back: RuntimeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
