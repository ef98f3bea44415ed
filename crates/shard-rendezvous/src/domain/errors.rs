//! # Domain Errors
//!
//! Error types for the rendezvous subsystem.
//!
//! Every variant is `Clone`: one outcome is broadcast to all participants,
//! so the failure a waiter receives is a copy of the owner's, not a
//! re-creation of it.

use std::sync::Arc;

use shard_runtime::{DispatchError, ShardId};
use thiserror::Error;

/// Result of a rendezvous, as seen by every participant.
pub type Outcome<T> = Result<T, RendezvousError>;

/// Rendezvous error types.
#[derive(Debug, Clone, Error)]
pub enum RendezvousError {
    /// The generator failed. Every participant receives the same `Arc`.
    #[error("Generator failed: {0}")]
    GeneratorFailed(Arc<anyhow::Error>),

    /// The owner (or the caller's target) shard cannot be reached.
    #[error("Shard unavailable: {0}")]
    ShardUnavailable(ShardId),

    /// Shard id outside the topology.
    #[error("Unknown shard: {0}")]
    UnknownShard(ShardId),

    /// Called from a thread that is not a shard of the rendezvous' runtime.
    #[error("Not running on a shard")]
    NotOnShard,

    /// A shard arrived twice in the same round.
    #[error("Shard {shard} already arrived at this rendezvous")]
    DuplicateArrival {
        /// Offending shard
        shard: ShardId,
    },

    /// Invalid phase transition.
    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition {
        /// Current phase
        from: String,
        /// Attempted phase
        to: String,
    },

    /// Internal bookkeeping broke an invariant.
    #[error("Rendezvous state inconsistency: {0}")]
    StateInconsistency(String),

    /// Runtime-level failure outside the cases above.
    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl RendezvousError {
    /// Wrap a generator failure.
    pub fn generator(err: impl Into<anyhow::Error>) -> Self {
        Self::GeneratorFailed(Arc::new(err.into()))
    }

    /// Whether two errors are the very same broadcast failure.
    ///
    /// Generator failures compare by identity; everything else by message.
    pub fn same_failure(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::GeneratorFailed(a), Self::GeneratorFailed(b)) => Arc::ptr_eq(a, b),
            _ => self.to_string() == other.to_string(),
        }
    }
}

impl From<DispatchError> for RendezvousError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::UnknownShard(shard) => Self::UnknownShard(shard),
            DispatchError::ShardUnavailable(shard) => Self::ShardUnavailable(shard),
            DispatchError::NotOnShard => Self::NotOnShard,
            other => Self::Runtime(other.to_string()),
        }
    }
}
