//! # Algorithms Module
//!
//! Arrival barrier, one-shot result cell, and the rendezvous built on them.

pub mod barrier;
pub mod rendezvous;
pub mod result_cell;

pub use barrier::{Arrival, ArrivalBarrier};
pub use rendezvous::{make_rendezvous, RendezvousPoint};
pub use result_cell::ResultCell;
