//! Re-exports of the logging macros used throughout the crate.

pub use slog_scope::{debug, error, info, warn};
