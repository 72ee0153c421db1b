//! Wire-level signaling messages.
//!
//! Every WebSocket frame carries one JSON object tagged by its `type` field.
//! The same [`Msg`] enum serves both directions, so messages relayed between
//! peers are re-serialized untouched.
//!
//! Deserialization is deliberately tolerant: only malformed JSON is an
//! error (and terminates the connection), while a well-formed object with an
//! unrecognized `type` or `role` decodes to something the router answers
//! with a [`ProtocolError::BadMessage`] reply, keeping the connection open.

use derive_more::Display;
use failure::Fail;
use serde::{de::Deserializer, Deserialize, Serialize};
use serde_json::Value;

/// Role of a participant inside a room.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    /// Participant streaming its point of view through smartglasses.
    #[display(fmt = "glass-wearer")]
    GlassWearer,

    /// Remote participant assisting the glass wearer.
    #[display(fmt = "observer")]
    Observer,
}

impl Role {
    /// Parses a wire-level role string, returning `None` for anything
    /// outside the closed set.
    fn from_wire(s: &str) -> Option<Self> {
        match s {
            "glass-wearer" => Some(Self::GlassWearer),
            "observer" => Some(Self::Observer),
            _ => None,
        }
    }
}

/// Failure reported to the originating client as an `error` message. The
/// connection stays open.
#[derive(Clone, Copy, Debug, Display, Eq, Fail, PartialEq)]
pub enum ProtocolError {
    /// Catch-all for internal failures.
    #[display(fmt = "Unknown error")]
    Unknown,

    /// The message was well-formed JSON but not a valid signaling message.
    #[display(fmt = "Bad message")]
    BadMessage,

    /// The requested action requires room membership.
    #[display(fmt = "This action cannot be performed as no room has been \
                     joined yet")]
    NoRoom,

    /// Another live client occupies the requested seat.
    #[display(fmt = "Role is already taken in room")]
    RoleTaken,

    /// The room name failed validation.
    #[display(fmt = "Invalid room name")]
    BadRoom,
}

impl ProtocolError {
    /// Returns the numeric code identifying this error on the wire.
    #[must_use]
    pub fn code(self) -> u16 {
        match self {
            Self::Unknown => 1,
            Self::BadMessage => 2,
            Self::NoRoom => 3,
            Self::RoleTaken => 4,
            Self::BadRoom => 5,
        }
    }
}

/// Top structure of the JSON messages transferred over a signaling
/// connection.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Msg {
    /// Reports a failure to process the last message.
    Error { code: u16, text: String },

    /// Application-level liveness request, answered with [`Msg::Pong`].
    Ping,

    /// Application-level reply to [`Msg::Ping`].
    Pong,

    /// Requests a seat in a room, or notifies a seated client about a peer
    /// taking the named role.
    Join {
        room: String,
        /// `None` when the received role string is outside the closed
        /// [`Role`] set; such a join is answered with a bad-message error.
        #[serde(skip_serializing_if = "Option::is_none")]
        role: Option<Role>,
    },

    /// Leaves the current room, or notifies remaining clients about a peer
    /// vacating the named role.
    Leave {
        #[serde(skip_serializing_if = "Option::is_none")]
        room: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        role: Option<Role>,
    },

    /// Session description offer, relayed verbatim between peers.
    Offer {
        #[serde(skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
        #[serde(
            rename = "iceServers",
            skip_serializing_if = "Option::is_none"
        )]
        ice_servers: Option<Value>,
    },

    /// Session description answer, relayed verbatim.
    Answer {
        #[serde(skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
    },

    /// Transport candidate, relayed verbatim.
    IceCandidate {
        #[serde(skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
    },

    /// Requests peers to restart their negotiation from scratch.
    Reset,

    /// Anything with an unrecognized or missing `type` tag. Never sent by
    /// the server; answered with a bad-message error.
    Invalid,
}

impl From<ProtocolError> for Msg {
    fn from(err: ProtocolError) -> Self {
        Self::Error {
            code: err.code(),
            text: err.to_string(),
        }
    }
}

impl<'de> Deserialize<'de> for Msg {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error as _;

        let val = Value::deserialize(deserializer)?;
        let map = val.as_object().ok_or_else(|| {
            D::Error::custom(format!("unable to deserialize Msg [{:?}]", &val))
        })?;

        let str_field = |field: &str| {
            map.get(field).and_then(Value::as_str).map(str::to_owned)
        };
        let role = map
            .get("role")
            .and_then(Value::as_str)
            .and_then(Role::from_wire);

        Ok(match map.get("type").and_then(Value::as_str) {
            Some("error") => Self::Error {
                code: map
                    .get("code")
                    .and_then(Value::as_u64)
                    .unwrap_or_default() as u16,
                text: str_field("text").unwrap_or_default(),
            },
            Some("ping") => Self::Ping,
            Some("pong") => Self::Pong,
            Some("join") => Self::Join {
                room: str_field("room").unwrap_or_default(),
                role,
            },
            Some("leave") => Self::Leave {
                room: str_field("room"),
                role,
            },
            Some("offer") => Self::Offer {
                payload: map.get("payload").cloned(),
                ice_servers: map.get("iceServers").cloned(),
            },
            Some("answer") => Self::Answer {
                payload: map.get("payload").cloned(),
            },
            Some("ice-candidate") => Self::IceCandidate {
                payload: map.get("payload").cloned(),
            },
            Some("reset") => Self::Reset,
            _ => Self::Invalid,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_join_notification() {
        let msg = Msg::Join {
            room: String::from("demo-room"),
            role: Some(Role::Observer),
        };

        assert_eq!(
            serde_json::to_string(&msg).unwrap(),
            "{\"type\":\"join\",\"room\":\"demo-room\",\
             \"role\":\"observer\"}",
        );
    }

    #[test]
    fn serializes_error_with_code_and_text() {
        let msg = Msg::from(ProtocolError::RoleTaken);

        assert_eq!(
            serde_json::to_string(&msg).unwrap(),
            "{\"type\":\"error\",\"code\":4,\
             \"text\":\"Role is already taken in room\"}",
        );
    }

    #[test]
    fn omits_absent_optional_fields() {
        let msg = Msg::Leave {
            room: None,
            role: None,
        };

        assert_eq!(serde_json::to_string(&msg).unwrap(), "{\"type\":\"leave\"}");
    }

    #[test]
    fn kebab_cases_ice_candidate_tag() {
        let msg = Msg::IceCandidate {
            payload: Some(Value::Null),
        };

        assert_eq!(
            serde_json::to_string(&msg).unwrap(),
            "{\"type\":\"ice-candidate\",\"payload\":null}",
        );
    }

    #[test]
    fn round_trips_offer_payload_verbatim() {
        let json = "{\"type\":\"offer\",\"payload\":{\"x\":1},\
                    \"iceServers\":[{\"urls\":[\"stun:stun.example.org\"]}]}";

        let msg: Msg = serde_json::from_str(json).unwrap();

        assert_eq!(serde_json::to_string(&msg).unwrap(), json);
    }

    #[test]
    fn ignores_unknown_fields() {
        let msg: Msg =
            serde_json::from_str("{\"type\":\"ping\",\"seq\":7}").unwrap();

        assert_eq!(msg, Msg::Ping);
    }

    #[test]
    fn maps_unknown_tags_to_invalid() {
        for json in &["{\"type\":\"broadcast\"}", "{\"data\":true}"] {
            let msg: Msg = serde_json::from_str(json).unwrap();

            assert_eq!(msg, Msg::Invalid, "in {}", json);
        }
    }

    #[test]
    fn keeps_join_with_unknown_role_roleless() {
        let msg: Msg = serde_json::from_str(
            "{\"type\":\"join\",\"room\":\"demo-room\",\"role\":\"pilot\"}",
        )
        .unwrap();

        assert_eq!(
            msg,
            Msg::Join {
                room: String::from("demo-room"),
                role: None,
            },
        );
    }

    #[test]
    fn rejects_non_object_frames() {
        assert!(serde_json::from_str::<Msg>("[1,2,3]").is_err());
        assert!(serde_json::from_str::<Msg>("\"join\"").is_err());
        assert!(serde_json::from_str::<Msg>("join demo-room").is_err());
    }
}
