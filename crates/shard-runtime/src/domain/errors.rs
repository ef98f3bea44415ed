//! # Domain Errors
//!
//! Error types for shard dispatch and runtime lifecycle.

use thiserror::Error;

/// Shard identifier (u16 supports up to 65536 shards).
pub type ShardId = u16;

/// Dispatch error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// Target shard is outside the topology.
    #[error("Unknown shard: {0}")]
    UnknownShard(ShardId),

    /// Target shard stopped accepting work (shut down or gone mid-job).
    #[error("Shard unavailable: {0}")]
    ShardUnavailable(ShardId),

    /// Caller is not running on a shard thread.
    #[error("Not running on a shard")]
    NotOnShard,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Shard thread or executor could not be started.
    #[error("Failed to spawn shard: {0}")]
    Spawn(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_shard_error() {
        let err = DispatchError::UnknownShard(99);
        assert!(err.to_string().contains("99"));
    }

    #[test]
    fn test_shard_unavailable_error() {
        let err = DispatchError::ShardUnavailable(3);
        assert_eq!(err.to_string(), "Shard unavailable: 3");
    }

    #[test]
    fn test_config_error() {
        let err = DispatchError::Config("zero shards".to_string());
        assert!(err.to_string().contains("zero shards"));
    }
}
