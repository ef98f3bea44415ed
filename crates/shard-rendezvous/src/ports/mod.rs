//! # Ports Layer
//!
//! Inbound API of the rendezvous subsystem.

pub mod inbound;

pub use inbound::RendezvousApi;
