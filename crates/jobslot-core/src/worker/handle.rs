use jobslot_model::{Artifact, JobId, JobRequest, WorkerReply, WorkerState};
use tokio::sync::{mpsc, watch};

use super::Caller;
use crate::{download::DownloadError, error::CoreError, task::TaskOutcome};

/// Everything that enters the worker's inbox.
#[derive(Debug)]
pub(super) enum Message {
    Run { request: JobRequest, caller: Caller },
    Cancel { id: JobId, requester: Caller },
    ForceShutdown,
    CompleteAndShutdown,
    Shutdown,
    ArtifactReady { ticket: u64, artifact: Artifact },
    DownloadFailed { ticket: u64, error: DownloadError },
    JobCompleted { ticket: u64, outcome: TaskOutcome },
}

impl Message {
    pub fn name(&self) -> &'static str {
        match self {
            Message::Run { .. } => "run",
            Message::Cancel { .. } => "cancel",
            Message::ForceShutdown => "force-shutdown",
            Message::CompleteAndShutdown => "complete-and-shutdown",
            Message::Shutdown => "shutdown",
            Message::ArtifactReady { .. } => "artifact-ready",
            Message::DownloadFailed { .. } => "download-failed",
            Message::JobCompleted { .. } => "job-completed",
        }
    }
}

/// Client side of a [`crate::Worker`]. Cheap to clone.
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    pub(super) tx: mpsc::UnboundedSender<Message>,
    pub(super) state: watch::Receiver<WorkerState>,
}

impl WorkerHandle {
    /// Ask the worker to run `request`; replies go to `caller`.
    pub fn run_job(&self, request: JobRequest, caller: Caller) -> Result<(), CoreError> {
        self.send(Message::Run { request, caller })
    }

    /// [`WorkerHandle::run_job`] with a fresh reply channel.
    pub fn submit(
        &self,
        request: JobRequest,
    ) -> Result<mpsc::UnboundedReceiver<WorkerReply>, CoreError> {
        let (caller, rx) = Caller::channel();
        self.run_job(request, caller)?;
        Ok(rx)
    }

    /// Cancel job `id`; the acknowledgement goes to `requester`.
    pub fn cancel(&self, id: impl Into<JobId>, requester: Caller) -> Result<(), CoreError> {
        self.send(Message::Cancel {
            id: id.into(),
            requester,
        })
    }

    /// Stop now; an in-flight job is abandoned.
    pub fn force_shutdown(&self) -> Result<(), CoreError> {
        self.send(Message::ForceShutdown)
    }

    /// Let the current job finish, then stop.
    pub fn complete_and_shutdown(&self) -> Result<(), CoreError> {
        self.send(Message::CompleteAndShutdown)
    }

    /// Stop an idle worker.
    pub fn shutdown(&self) -> Result<(), CoreError> {
        self.send(Message::Shutdown)
    }

    /// Last published worker state.
    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    /// Wait until the worker publishes `target`.
    pub async fn wait_for(&self, target: WorkerState) -> Result<(), CoreError> {
        let mut rx = self.state.clone();
        rx.wait_for(|s| *s == target)
            .await
            .map(|_| ())
            .map_err(|_| CoreError::WorkerStopped)
    }

    fn send(&self, msg: Message) -> Result<(), CoreError> {
        self.tx.send(msg).map_err(|_| CoreError::WorkerStopped)
    }
}
