//! # Domain Invariants
//!
//! Rules a rendezvous round must never break. The owner checks the
//! arrival invariant right before running the generator; the agreement
//! invariant is what callers (and tests) can check after the round.

use shard_runtime::ShardId;

use super::errors::{Outcome, RendezvousError};

/// Invariant: the generator runs only after every shard has arrived.
pub fn invariant_all_arrived(arrivals: usize, total: usize) -> Result<(), RendezvousError> {
    if arrivals != total {
        return Err(RendezvousError::StateInconsistency(format!(
            "Generator requested with {}/{} arrivals",
            arrivals, total
        )));
    }
    Ok(())
}

/// Invariant: a shard arrives at most once per round.
pub fn invariant_single_arrival(shard: ShardId, already_arrived: bool) -> Result<(), RendezvousError> {
    if already_arrived {
        return Err(RendezvousError::DuplicateArrival { shard });
    }
    Ok(())
}

/// Invariant: the generator runs exactly once per instance.
pub fn invariant_single_computation(invocations: usize) -> Result<(), RendezvousError> {
    if invocations != 1 {
        return Err(RendezvousError::StateInconsistency(format!(
            "Generator invoked {} times",
            invocations
        )));
    }
    Ok(())
}

/// Invariant: all participants observed the identical outcome.
///
/// Values compare by equality, failures by identity
/// (see [`RendezvousError::same_failure`]).
pub fn invariant_agreement<T: PartialEq>(outcomes: &[Outcome<T>]) -> Result<(), RendezvousError> {
    let Some(first) = outcomes.first() else {
        return Ok(());
    };

    for (index, outcome) in outcomes.iter().enumerate().skip(1) {
        let agrees = match (first, outcome) {
            (Ok(a), Ok(b)) => a == b,
            (Err(a), Err(b)) => a.same_failure(b),
            _ => false,
        };
        if !agrees {
            return Err(RendezvousError::StateInconsistency(format!(
                "Participant {} diverged from participant 0",
                index
            )));
        }
    }
    Ok(())
}
