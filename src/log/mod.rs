//! Logging initialization.

pub mod prelude;

use slog::{o, Drain, Logger};
use slog_scope::GlobalLoggerGuard;

/// Initializes a [`slog`] logger outputting logs with a [`slog_term`]'s
/// decorator, and bridges the [`log`] crate facade into it so that
/// third-party middleware logs end up in the same sink.
///
/// # Panics
///
/// If [`slog_stdlog`] fails to [initialize](slog_stdlog::init).
pub fn init() -> GlobalLoggerGuard {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_envlogger::new(drain).fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    let logger = Logger::root(drain, o!());
    let guard = slog_scope::set_global_logger(logger);
    slog_stdlog::init().unwrap();

    guard
}
