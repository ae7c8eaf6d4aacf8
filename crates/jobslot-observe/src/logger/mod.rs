//! Global subscriber for a worker process.
//!
//! One console output (text, JSON or journald) plus the [`SinkLayer`](crate::SinkLayer) that copies events into attached job sinks.

mod config;
mod error;
mod format;
mod log;

pub use config::{FILTER_ENV, FORMAT_ENV, LoggerConfig};
pub use error::LoggerError;
pub use format::LoggerFormat;

use crate::SinkRegistry;

/// Install the global subscriber.
///
/// Returns the sink root to hand to the worker as its log root; it is the registry from `cfg`.
pub fn logger_init(cfg: &LoggerConfig) -> Result<SinkRegistry, LoggerError> {
    log::install(cfg)
}
