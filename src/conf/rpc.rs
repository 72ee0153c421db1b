//! Timing of client connections.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;

/// [`Conf`] section with liveness timing of client connections.
///
/// [`Conf`]: crate::conf::Conf
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, SmartDefault)]
#[serde(default)]
pub struct Rpc {
    /// Interval between transport-level keepalive pings sent to a connected
    /// client.
    ///
    /// Defaults to `60s`.
    #[default(Duration::from_secs(60))]
    #[serde(with = "humantime_serde")]
    pub ping_interval: Duration,

    /// How long a probed client may take to show signs of life before its
    /// connection is considered dead.
    ///
    /// Defaults to `5s`.
    #[default(Duration::from_secs(5))]
    #[serde(with = "humantime_serde")]
    pub pong_timeout: Duration,

    /// How long buffered writes may take to drain when the server shuts
    /// down.
    ///
    /// Defaults to `10s`.
    #[default(Duration::from_secs(10))]
    #[serde(with = "humantime_serde")]
    pub write_timeout: Duration,
}
