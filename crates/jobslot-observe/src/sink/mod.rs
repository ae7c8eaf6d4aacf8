//! Per-job log capture.
//!
//! A [`SinkFactory`] decides whether a job gets a sink at all; a [`LogRoot`] is the process-wide attachment point the worker attaches to and detaches from, keyed by job id.
//! [`SinkRegistry`] is the in-process root: wire it into the global subscriber through [`SinkLayer`] (or [`crate::LoggerConfig::with_sinks`]) and every event recorded while a sink is attached is copied into it.

mod file;
mod layer;
mod memory;
mod registry;

pub use file::{FileSink, FileSinks};
pub use layer::SinkLayer;
pub use memory::MemorySink;
pub use registry::SinkRegistry;

use std::sync::Arc;

use jobslot_model::JobId;
use tracing::Level;

/// Target used by sink internals; [`SinkLayer`] never forwards it.
pub const SINK_TARGET: &str = "jobslot.observe.sink";

/// One captured log event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub level: Level,
    pub target: String,
    /// Event message followed by its `key=value` fields.
    pub message: String,
}

/// Destination for one job's log output.
pub trait LogSink: Send + Sync + 'static {
    fn write(&self, record: &LogRecord);

    fn flush(&self) {}
}

/// Produces the sink for a job, if that job should have one.
pub trait SinkFactory: Send + Sync + 'static {
    fn for_job(&self, id: &JobId) -> Option<Arc<dyn LogSink>>;
}

/// Shared logging root with append/remove-by-key semantics.
pub trait LogRoot: Send + Sync + 'static {
    fn attach(&self, id: &JobId, sink: Arc<dyn LogSink>);

    /// Returns `true` if a sink was attached under `id`.
    fn detach(&self, id: &JobId) -> bool;
}

/// Factory for workers that do not capture per-job logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSinks;

impl SinkFactory for NoSinks {
    fn for_job(&self, _id: &JobId) -> Option<Arc<dyn LogSink>> {
        None
    }
}
