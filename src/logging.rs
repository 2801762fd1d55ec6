//! Logging capability handed to the codec and client.
//!
//! Components never reach for a global logger; they hold an `Arc<dyn LogSink>`.
//! The default sink forwards to the `log` facade.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use log::Level;

pub trait LogSink: Send + Sync {
    fn log(&self, level: Level, message: &str);

    /// Lets callers skip formatting messages nobody will read.
    fn enabled(&self, _level: Level) -> bool {
        true
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl LogSink for NullSink {
    fn log(&self, _level: Level, _message: &str) {}

    fn enabled(&self, _level: Level) -> bool {
        false
    }
}

/// Forwards to whatever logger is installed behind the `log` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogFacade;

impl LogSink for LogFacade {
    fn log(&self, level: Level, message: &str) {
        log::log!(target: "xmlrpc", level, "{}", message);
    }

    fn enabled(&self, level: Level) -> bool {
        log::log_enabled!(target: "xmlrpc", level)
    }
}

/// A panicking closure loses its message; the panic never reaches the codec.
impl<F> LogSink for F
where
    F: Fn(Level, &str) + Send + Sync,
{
    fn log(&self, level: Level, message: &str) {
        let _ = panic::catch_unwind(AssertUnwindSafe(|| self(level, message)));
    }
}

pub fn default_sink() -> Arc<dyn LogSink> {
    Arc::new(LogFacade)
}
