//! Signaling router: the sole owner of all room and seat state.
//!
//! The router is an actor processing one event at a time, so no two
//! mutations of room state can race. Client handlers talk to it through two
//! message types: [`Inbound`] for everything read from a connection
//! (including the synthetic leave a dying handler emits), and [`Alive`] for
//! confirmations of a takeover probe.

use std::collections::HashMap;

use actix::{Actor, Context, Handler, Message};

use crate::{
    api::client::{
        connection::Client,
        msg::{Msg, ProtocolError, Role},
    },
    log::prelude::*,
    signalling::room::{self, Room},
};

/// Message read from a client's connection, stamped with its origin.
#[derive(Debug, Message)]
#[rtype(result = "()")]
pub struct Inbound {
    /// Client whose connection produced the message.
    pub origin: Client,

    /// The message itself.
    pub msg: Msg,
}

/// Confirmation that a client has answered a takeover probe.
#[derive(Debug, Message)]
#[rtype(result = "()")]
pub struct Alive(pub Client);

/// Routes signaling messages between clients and arbitrates seat takeovers.
#[derive(Debug, Default)]
pub struct Router {
    /// All rooms having at least one seated client.
    rooms: HashMap<String, Room>,

    /// Reverse index from a client to the name of the room it is associated
    /// with.
    clients: HashMap<Client, String>,
}

impl Router {
    /// Creates a new [`Router`] with no rooms.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles a single message read from `origin`'s connection.
    fn dispatch(&mut self, origin: Client, msg: Msg) {
        match msg {
            Msg::Ping => origin.send(Msg::Pong),
            Msg::Join { room, role } => self.join(origin, &room, role),
            Msg::Leave { .. } => self.leave(&origin),
            msg @ (Msg::Offer { .. }
            | Msg::Answer { .. }
            | Msg::IceCandidate { .. }
            | Msg::Reset) => self.forward(&origin, msg),
            Msg::Error { .. } | Msg::Pong | Msg::Invalid => {
                origin.send(ProtocolError::BadMessage.into());
            }
        }
    }

    /// Seats `client` in the room `name` under `role`, or records it as the
    /// waiter of an occupied seat and probes the incumbent.
    ///
    /// The waiter is resolved later: an [`Alive`] confirmation of the
    /// incumbent rejects it with a role-taken error, while the incumbent's
    /// leave promotes it into the freed seat.
    fn join(&mut self, client: Client, name: &str, role: Option<Role>) {
        let role = match role {
            Some(role) => role,
            None => {
                client.send(ProtocolError::BadMessage.into());
                return;
            }
        };
        let name = name.to_lowercase();
        if !room::is_valid_name(&name) {
            client.send(ProtocolError::BadRoom.into());
            return;
        }

        self.leave(&client);

        let room = self.rooms.entry(name.clone()).or_insert_with(Room::new);
        self.clients.insert(client.clone(), name.clone());

        if let Some(incumbent) = room.seats.get(&role).cloned() {
            debug!(
                "Client {} waits for {} in room {}",
                client.id(),
                role,
                name,
            );
            if let Some(displaced) = room.waiting.insert(role, client) {
                displaced.send(ProtocolError::RoleTaken.into());
            }
            incumbent.probe();
        } else {
            info!("Client {} joined room {} as {}", client.id(), name, role);
            room.seats.insert(role, client.clone());
            for (seat_role, seated) in &room.seats {
                if *seated != client {
                    seated.send(Msg::Join {
                        room: name.clone(),
                        role: Some(role),
                    });
                    client.send(Msg::Join {
                        room: name.clone(),
                        role: Some(*seat_role),
                    });
                }
            }
        }
    }

    /// Removes `client` from its room, notifying remaining seats and
    /// promoting the vacated role's waiter, if any.
    fn leave(&mut self, client: &Client) {
        let name = match self.clients.remove(client) {
            Some(name) => name,
            None => return,
        };
        let mut promoted = None;
        if let Some(room) = self.rooms.get_mut(&name) {
            room.waiting.retain(|_, waiter| waiter != client);
            if let Some(role) = room.seat_of(client) {
                room.seats.remove(&role);
                info!("Client {} left room {}", client.id(), name);
                for seated in room.seats.values() {
                    seated.send(Msg::Leave {
                        room: Some(name.clone()),
                        role: Some(role),
                    });
                }
                promoted = room.waiting.remove(&role).map(|w| (w, role));
            }
        }
        self.put_room(&name);
        if let Some((waiter, role)) = promoted {
            self.join(waiter, &name, Some(role));
        }
    }

    /// Delivers `msg` to every seated client of `origin`'s room except
    /// `origin` itself.
    fn forward(&mut self, origin: &Client, msg: Msg) {
        match self.clients.get(origin) {
            Some(name) => {
                if let Some(room) = self.rooms.get(name) {
                    for seated in room.seats.values() {
                        if seated != origin {
                            seated.send(msg.clone());
                        }
                    }
                }
            }
            None => origin.send(ProtocolError::NoRoom.into()),
        }
    }

    /// Rejects the pending waiter of the seat `client` is confirmed to still
    /// hold.
    fn confirm_alive(&mut self, client: &Client) {
        let name = match self.clients.get(client) {
            Some(name) => name.clone(),
            None => return,
        };
        if let Some(room) = self.rooms.get_mut(&name) {
            if let Some(role) = room.seat_of(client) {
                if let Some(waiter) = room.waiting.remove(&role) {
                    debug!(
                        "Client {} is alive, rejecting waiter {}",
                        client.id(),
                        waiter.id(),
                    );
                    waiter.send(ProtocolError::RoleTaken.into());
                }
            }
        }
    }

    /// Drops the room `name` from the index once no seats remain occupied.
    fn put_room(&mut self, name: &str) {
        if self.rooms.get(name).map_or(false, |r| r.seats.is_empty()) {
            self.rooms.remove(name);
        }
    }
}

impl Actor for Router {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        ctx.set_mailbox_capacity(100);
        debug!("Router started");
    }
}

impl Handler<Inbound> for Router {
    type Result = ();

    fn handle(&mut self, msg: Inbound, _: &mut Self::Context) {
        self.dispatch(msg.origin, msg.msg);
    }
}

impl Handler<Alive> for Router {
    type Result = ();

    fn handle(&mut self, msg: Alive, _: &mut Self::Context) {
        self.confirm_alive(&msg.0);
    }
}
