//! # Domain Module
//!
//! Core types for the shard runtime: identifiers, errors, configuration.

pub mod config;
pub mod errors;

pub use config::*;
pub use errors::*;
