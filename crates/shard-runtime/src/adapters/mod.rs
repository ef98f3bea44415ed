//! # Adapters Layer (Hexagonal Architecture)
//!
//! Implements the dispatcher port on real threads.

mod thread_per_core;

pub use thread_per_core::ShardRuntime;
