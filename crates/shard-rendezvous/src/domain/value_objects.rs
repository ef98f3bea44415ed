//! # Domain Value Objects
//!
//! Immutable value types for the rendezvous round.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Rendezvous round state machine.
///
/// ```text
/// Pending ──(arrivals == N)──► Computing ──► Resolved
///                                  └───────► Failed
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Phase {
    /// Waiting for shards to arrive.
    #[default]
    Pending,
    /// Every shard arrived; the owner is running the generator.
    Computing,
    /// Result cell holds a value.
    Resolved,
    /// Result cell holds a failure.
    Failed,
}

impl Phase {
    /// Check if transition to next phase is valid.
    pub fn can_transition_to(&self, next: Phase) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Computing)
                | (Self::Computing, Self::Resolved)
                | (Self::Computing, Self::Failed)
        )
    }

    /// Check if this is a terminal phase.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved | Self::Failed)
    }

    /// Terminal phase matching a generator outcome.
    pub fn settled<T, E>(outcome: &Result<T, E>) -> Self {
        if outcome.is_ok() {
            Self::Resolved
        } else {
            Self::Failed
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Process-unique identity of a rendezvous instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RendezvousId(pub u64);

impl fmt::Display for RendezvousId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rv-{}", self.0)
    }
}
