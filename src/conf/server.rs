//! HTTP listener settings.

use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;

/// [`Conf`] section for the HTTP listener.
///
/// [`Conf`]: crate::conf::Conf
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, SmartDefault)]
#[serde(default)]
pub struct Server {
    /// Address the server binds to.
    ///
    /// Defaults to `0.0.0.0:8080`.
    #[default(String::from("0.0.0.0:8080"))]
    pub listen: String,
}
