//! # Shard Rendezvous
//!
//! Compute one value on one shard, lazily, once every shard has asked for
//! it, and hand the same value (or the same failure) to all of them.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! Shards in a thread-per-core process sometimes need to agree on a value
//! that only one of them may produce, for example a version number drawn
//! from one shard's counter. A [`RendezvousPoint`] is a single-use barrier
//! plus broadcast:
//!
//! - Every shard calls [`RendezvousPoint::resolve`] exactly once
//! - The generator runs exactly once, on the owner shard, after the last
//!   arrival
//! - All callers receive the identical outcome
//!
//! ## Round Lifecycle
//!
//! ```text
//! shard k ──resolve()──► hop to owner ──► arrive(k)
//!                                           │
//!                   arrivals < N ◄──────────┤
//!                   (suspend on a wake)     │ arrivals == N
//!                                           ▼
//!                              owner: Computing ─► generator()
//!                                           │
//!                              fill result cell (Resolved | Failed)
//!                                           │
//!                              wake N-1 waiters ─► each hops home with a clone
//! ```
//!
//! ## Guarantees
//!
//! | Property | Enforced by |
//! |----------|-------------|
//! | Generator runs once | `Phase` transitions + consumed generator |
//! | Never before all arrive | `invariant_all_arrived` on the owner |
//! | Same outcome for all | one `OnceLock` cell, filled before waking |
//! | No locks | owner-confined state in shard-local storage |
//!
//! A shard that never calls `resolve()` stalls the round forever; there
//! is no timeout.
//!
//! ## Module Structure
//!
//! ```text
//! shard-rendezvous/
//! ├── domain/          # RendezvousError, Phase, RendezvousId, invariants
//! ├── algorithms/      # ArrivalBarrier, ResultCell, RendezvousPoint
//! ├── ports/           # RendezvousApi trait
//! └── adapters/        # VersionGenerator + version rendezvous glue
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod algorithms;
pub mod domain;
pub mod ports;

// Re-exports
pub use adapters::{next_version, version_rendezvous, version_rendezvous_on, VersionGenerator};
pub use algorithms::{make_rendezvous, Arrival, ArrivalBarrier, RendezvousPoint, ResultCell};
pub use domain::{
    invariant_agreement, invariant_all_arrived, invariant_single_arrival,
    invariant_single_computation, Outcome, Phase, RendezvousError, RendezvousId,
};
pub use ports::RendezvousApi;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
