//! Logging capability handed to the client
//!
//! The client never installs or assumes a global subscriber. It logs through whatever
//! `InstrumentLogger` it was given; `NullLogger` is used when none is.

use tracing::Level;

pub trait InstrumentLogger: Send + Sync {
    fn log(&self, level: Level, message: &str);

    fn debug(&self, message: &str) {
        self.log(Level::DEBUG, message);
    }

    fn info(&self, message: &str) {
        self.log(Level::INFO, message);
    }

    fn warn(&self, message: &str) {
        self.log(Level::WARN, message);
    }

    fn error(&self, message: &str) {
        self.log(Level::ERROR, message);
    }
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLogger;

impl InstrumentLogger for NullLogger {
    fn log(&self, _level: Level, _message: &str) {}
}

/// Forwards to `tracing` under the `p1125` target
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl InstrumentLogger for TracingLogger {
    fn log(&self, level: Level, message: &str) {
        if level == Level::ERROR {
            tracing::error!(target: "p1125", "{}", message);
        } else if level == Level::WARN {
            tracing::warn!(target: "p1125", "{}", message);
        } else if level == Level::INFO {
            tracing::info!(target: "p1125", "{}", message);
        } else if level == Level::DEBUG {
            tracing::debug!(target: "p1125", "{}", message);
        } else {
            tracing::trace!(target: "p1125", "{}", message);
        }
    }
}
