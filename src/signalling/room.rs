//! Rooms and their seats.

use std::collections::HashMap;

use crate::api::client::{connection::Client, msg::Role};

/// Checks whether `name` is a well-formed room name: 5 to 64 characters
/// drawn from lowercase ASCII letters, digits, `-` and `_`.
#[must_use]
pub fn is_valid_name(name: &str) -> bool {
    (5..=64).contains(&name.len())
        && name
            .bytes()
            .all(|b| matches!(b, b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_'))
}

/// Named meeting point of clients, holding at most one seated client and at
/// most one takeover waiter per [`Role`]. The name lives in the router's
/// index only.
#[derive(Debug, Default)]
pub struct Room {
    /// Accepted occupant of each role.
    pub seats: HashMap<Role, Client>,

    /// Pending replacement of each role, kept until the incumbent either
    /// proves its liveness or leaves.
    pub waiting: HashMap<Role, Client>,
}

impl Room {
    /// Creates a new empty [`Room`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the role occupied by `client`, if it is seated in this room.
    #[must_use]
    pub fn seat_of(&self, client: &Client) -> Option<Role> {
        self.seats
            .iter()
            .find(|(_, seated)| *seated == client)
            .map(|(role, _)| *role)
    }
}
