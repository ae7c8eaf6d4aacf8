use std::sync::Arc;

use jobslot_model::JobId;
use tokio_util::sync::CancellationToken;

/// Live compute-engine session shared by every job this worker runs.
///
/// Work is tagged with the job id before dispatch so that it can be cancelled by tag without tearing down the session.
pub trait ExecutionContext: Send + Sync + 'static {
    /// Tag work dispatched from now on with `group`.
    fn set_job_group(&self, group: &JobId);

    /// Cancel all work tagged with `group`.
    fn cancel_job_group(&self, group: &JobId);

    /// Drop the tag once the job has concluded.
    fn clear_job_group(&self, _group: &JobId) {}

    /// Token cancelled together with `group`, for runners that wait on engine work.
    fn job_group_token(&self, _group: &JobId) -> Option<CancellationToken> {
        None
    }

    /// Streaming sub-engine currently running on top of the session, if any.
    fn active_stream(&self) -> Option<Arc<dyn StreamEngine>> {
        None
    }
}

/// Streaming sub-engine that can be stopped independently of the session.
pub trait StreamEngine: Send + Sync + 'static {
    fn name(&self) -> &str;

    /// Stop the sub-engine; `graceful` lets in-flight batches finish.
    fn stop(&self, graceful: bool);
}
