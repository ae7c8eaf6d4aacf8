use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
};

use jobslot_core::{ExecutionContext, StreamEngine};
use jobslot_model::JobId;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

const TARGET: &str = "jobslot.exec.engine";

/// In-process execution context.
///
/// Each job group owns a [`CancellationToken`]; work started for the current group should observe [`LocalEngine::current_token`].
#[derive(Default)]
pub struct LocalEngine {
    groups: Mutex<HashMap<JobId, CancellationToken>>,
    current: Mutex<Option<JobId>>,
    stream: Mutex<Option<Arc<LocalStream>>>,
}

impl LocalEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token of `group`, if it is tagged.
    pub fn group_token(&self, group: &JobId) -> Option<CancellationToken> {
        self.groups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(group)
            .cloned()
    }

    /// Token of the group new work is tagged with.
    pub fn current_token(&self) -> Option<CancellationToken> {
        let current = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()?;
        self.group_token(&current)
    }

    pub fn current_group(&self) -> Option<JobId> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_group_cancelled(&self, group: &JobId) -> bool {
        self.group_token(group)
            .is_some_and(|token| token.is_cancelled())
    }

    /// Start a streaming sub-engine, replacing a previous one.
    pub fn start_stream(&self, name: impl Into<String>) -> Arc<LocalStream> {
        let stream = Arc::new(LocalStream::new(name));
        let previous = self
            .stream
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(Arc::clone(&stream));
        if let Some(previous) = previous {
            previous.stop(false);
        }
        debug!(target: TARGET, stream = stream.name(), "stream started");
        stream
    }
}

impl ExecutionContext for LocalEngine {
    fn set_job_group(&self, group: &JobId) {
        self.groups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(group.clone(), CancellationToken::new());
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(group.clone());
        trace!(target: TARGET, job_id = %group, "job group set");
    }

    fn cancel_job_group(&self, group: &JobId) {
        match self.group_token(group) {
            Some(token) => {
                token.cancel();
                debug!(target: TARGET, job_id = %group, "job group cancelled");
            }
            None => trace!(target: TARGET, job_id = %group, "cancel for unknown job group"),
        }
    }

    fn clear_job_group(&self, group: &JobId) {
        self.groups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(group);
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if current.as_ref() == Some(group) {
            *current = None;
        }
        trace!(target: TARGET, job_id = %group, "job group cleared");
    }

    fn job_group_token(&self, group: &JobId) -> Option<CancellationToken> {
        self.group_token(group)
    }

    fn active_stream(&self) -> Option<Arc<dyn StreamEngine>> {
        let stream = self
            .stream
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()?;
        if stream.is_stopped() {
            return None;
        }
        Some(stream)
    }
}

/// Streaming sub-engine owned by a [`LocalEngine`].
#[derive(Debug)]
pub struct LocalStream {
    name: String,
    stopped: CancellationToken,
    graceful: AtomicBool,
}

impl LocalStream {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stopped: CancellationToken::new(),
            graceful: AtomicBool::new(false),
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.is_cancelled()
    }

    /// Whether the first stop asked for a graceful shutdown.
    pub fn stopped_gracefully(&self) -> bool {
        self.graceful.load(Ordering::Acquire)
    }

    /// Token cancelled once the stream is stopped; stream loops select on it.
    pub fn stopped(&self) -> CancellationToken {
        self.stopped.clone()
    }
}

impl StreamEngine for LocalStream {
    fn name(&self) -> &str {
        &self.name
    }

    fn stop(&self, graceful: bool) {
        if self.stopped.is_cancelled() {
            return;
        }
        self.graceful.store(graceful, Ordering::Release);
        self.stopped.cancel();
        debug!(target: TARGET, stream = %self.name, graceful, "stream stopped");
    }
}
