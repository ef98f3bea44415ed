//! # Ports Module
//!
//! Traits the rest of the system depends on instead of concrete runtimes.

pub mod dispatcher;

pub use dispatcher::{run_on, ShardDispatcher, ShardJob};
