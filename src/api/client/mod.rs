//! Implementation of the client-facing WebSocket API.

pub mod connection;
pub mod msg;
pub mod server;
pub mod session;
