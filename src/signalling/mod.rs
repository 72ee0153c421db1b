//! Room bookkeeping and message routing between clients.

pub mod room;
pub mod router;

pub use self::{room::Room, router::Router};
