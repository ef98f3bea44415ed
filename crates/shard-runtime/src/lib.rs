//! # Shard Runtime
//!
//! Shared-nothing, thread-per-core execution for shard-aware components.
//!
//! **Architecture:** Hexagonal (Ports/Adapters)
//!
//! ## Model
//!
//! - A fixed set of shards, one OS thread each, for the life of the runtime
//! - Each shard runs single-threaded cooperative tasks; no intra-shard races
//! - Cross-shard work travels only as jobs submitted through a
//!   [`ShardDispatcher`]
//! - State that must stay on one shard lives in shard-local storage
//!   ([`local`])
//!
//! ## Module Structure
//!
//! ```text
//! shard-runtime/
//! ├── domain/          # ShardId, DispatchError, RuntimeConfig
//! ├── ports/           # ShardDispatcher trait + run_on helper
//! ├── adapters/        # ShardRuntime (thread-per-core)
//! ├── context.rs       # current shard / dispatcher of the calling thread
//! └── local.rs         # shard-local storage
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod context;
pub mod domain;
pub mod local;
pub mod ports;

// Re-exports
pub use adapters::ShardRuntime;
pub use context::{current_dispatcher, current_shard};
pub use domain::{
    DispatchError, RuntimeConfig, ShardId, DEFAULT_THREAD_PREFIX, MAX_SHARD_COUNT,
    MIN_SHARD_COUNT,
};
pub use ports::{run_on, ShardDispatcher, ShardJob};
