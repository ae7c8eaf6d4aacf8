use std::fmt;

use serde::{Deserialize, Serialize};

/// Externally visible lifecycle state of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WorkerState {
    /// No active job.
    Idle,
    /// Request accepted, artifact fetch in flight.
    Downloading,
    /// Job body executing.
    Running,
    /// Job body executing; the worker terminates once it concludes.
    Draining,
    Terminated,
}

impl WorkerState {
    /// `true` while a job occupies the slot.
    pub fn is_occupied(&self) -> bool {
        matches!(
            self,
            WorkerState::Downloading | WorkerState::Running | WorkerState::Draining
        )
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkerState::Idle => "idle",
            WorkerState::Downloading => "downloading",
            WorkerState::Running => "running",
            WorkerState::Draining => "draining",
            WorkerState::Terminated => "terminated",
        };
        f.write_str(s)
    }
}
