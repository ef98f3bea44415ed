//! # Adapters Layer
//!
//! Ready-made generators and the glue that binds them to a rendezvous.

mod version_counter;

pub use version_counter::{next_version, version_rendezvous, version_rendezvous_on, VersionGenerator};
