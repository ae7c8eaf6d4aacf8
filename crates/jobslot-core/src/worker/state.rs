use std::sync::Arc;

use jobslot_model::{Artifact, JobId, JobRequest, WorkerState};
use jobslot_observe::LogSink;
use tokio::task::JoinHandle;

use super::{Caller, Exit};
use crate::task::TaskHandle;

/// The single occupied job slot.
pub(super) struct Slot {
    pub request: JobRequest,
    pub caller: Caller,
    /// Correlates internal events with this occupancy.
    pub ticket: u64,
    pub sink: Option<Arc<dyn LogSink>>,
    /// Fetched artifact, handed back to the downloader on release.
    pub artifact: Option<Artifact>,
    /// Execution context carries this job's group tag.
    pub tagged: bool,
}

impl Slot {
    #[inline]
    pub fn id(&self) -> &JobId {
        &self.request.id
    }
}

pub(super) enum State {
    Idle,
    Downloading {
        slot: Slot,
        download: JoinHandle<()>,
        drain: bool,
    },
    Running {
        slot: Slot,
        task: TaskHandle,
    },
    /// Running, but terminate instead of returning to idle.
    Draining {
        slot: Slot,
        task: TaskHandle,
    },
    Terminated(Exit),
}

impl State {
    pub fn view(&self) -> WorkerState {
        match self {
            State::Idle => WorkerState::Idle,
            State::Downloading { .. } => WorkerState::Downloading,
            State::Running { .. } => WorkerState::Running,
            State::Draining { .. } => WorkerState::Draining,
            State::Terminated(_) => WorkerState::Terminated,
        }
    }

    pub fn job_id(&self) -> Option<&JobId> {
        match self {
            State::Downloading { slot, .. }
            | State::Running { slot, .. }
            | State::Draining { slot, .. } => Some(slot.id()),
            State::Idle | State::Terminated(_) => None,
        }
    }
}
