//! Router-facing handle of a signaling connection.

use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};

use derive_more::Display;

use crate::api::client::msg::Msg;

/// ID of a signaling connection, unique for the lifetime of the server
/// process.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub struct ClientId(pub u64);

/// Abstraction over the transport side of a connected client.
///
/// Both operations are fire-and-forget: they never block the caller, and
/// calls addressed to an already terminated connection are silently dropped.
pub trait Connection: fmt::Debug + Send + Sync {
    /// Enqueues `msg` for outbound delivery.
    fn send(&self, msg: Msg);

    /// Requests a transport-level liveness probe of the remote client.
    ///
    /// The outcome is reported asynchronously: either the router receives an
    /// alive confirmation, or the probed connection times out and leaves.
    fn probe(&self);
}

/// Handle of a connected client as the router sees it.
///
/// Equality and hashing go by [`ClientId`], so a handle can key the router's
/// indexes while staying cheaply cloneable.
#[derive(Clone, Debug)]
pub struct Client {
    id: ClientId,
    conn: Arc<dyn Connection>,
}

impl Client {
    /// Creates a new handle for the given connection.
    #[must_use]
    pub fn new(id: ClientId, conn: Arc<dyn Connection>) -> Self {
        Self { id, conn }
    }

    /// Returns the ID of this client.
    #[must_use]
    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Enqueues `msg` for delivery to this client.
    pub fn send(&self, msg: Msg) {
        self.conn.send(msg);
    }

    /// Asks this client's connection to prove its liveness.
    pub fn probe(&self) {
        self.conn.probe();
    }
}

impl Eq for Client {}

impl PartialEq for Client {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Hash for Client {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
