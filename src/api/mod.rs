//! API implementations of the signaling server.

pub mod client;
