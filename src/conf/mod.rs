//! Application configuration.
//!
//! Settings are read from an optional TOML file merged with `WIZZEYE_`
//! prefixed environment variables, e.g. `WIZZEYE_RPC__PONG_TIMEOUT=2s`
//! overrides `[rpc] pong_timeout`.

pub mod rpc;
pub mod server;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

pub use self::{rpc::Rpc, server::Server};

/// Prefix of environment variables overriding configuration values.
const ENV_PREFIX: &str = "WIZZEYE";

/// All application settings.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Conf {
    /// HTTP listener settings.
    pub server: Server,

    /// Timing of client connections.
    pub rpc: Rpc,
}

impl Conf {
    /// Creates a new [`Conf`] from the given TOML file (tolerated to be
    /// absent) merged with environment variable overrides.
    ///
    /// # Errors
    ///
    /// Errors if a present configuration source cannot be read or fails to
    /// deserialize.
    pub fn parse(file: Option<&str>) -> Result<Self, ConfigError> {
        let mut cfg = Config::new();
        if let Some(path) = file {
            cfg.merge(File::with_name(path).required(false))?;
        }
        cfg.merge(Environment::with_prefix(ENV_PREFIX).separator("__"))?;
        cfg.try_into()
    }
}
