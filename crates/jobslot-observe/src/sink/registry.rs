use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, PoisonError, RwLock},
};

use jobslot_model::JobId;
use tracing::trace;

use super::{LogRecord, LogRoot, LogSink, SINK_TARGET};

/// In-process [`LogRoot`]: attached sinks indexed by job id.
#[derive(Clone, Default)]
pub struct SinkRegistry {
    inner: Arc<RwLock<HashMap<JobId, Arc<dyn LogSink>>>>,
}

impl SinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_attached(&self, id: &JobId) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy a record into every attached sink.
    pub fn dispatch(&self, record: &LogRecord) {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        for sink in inner.values() {
            sink.write(record);
        }
    }
}

impl LogRoot for SinkRegistry {
    fn attach(&self, id: &JobId, sink: Arc<dyn LogSink>) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = inner.insert(id.clone(), sink) {
            previous.flush();
        }
        trace!(target: SINK_TARGET, job_id = %id, "sink attached");
    }

    fn detach(&self, id: &JobId) -> bool {
        let removed = self
            .inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
        match removed {
            Some(sink) => {
                sink.flush();
                trace!(target: SINK_TARGET, job_id = %id, "sink detached");
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for SinkRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkRegistry")
            .field("attached", &self.len())
            .finish()
    }
}
