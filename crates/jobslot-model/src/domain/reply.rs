use serde::{Deserialize, Serialize};

use crate::{Failure, JobData, JobId};

/// Messages the worker sends back to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WorkerReply {
    /// Request accepted; the artifact fetch has started.
    JobFileDownloading { id: JobId },
    /// Artifact fetched and the job body is executing.
    JobStarted { id: JobId },
    /// Another job occupies the worker; the request was rejected.
    WorkerIsBusy { id: JobId },
    JobSuccess { id: JobId, data: JobData },
    JobFailure { id: JobId, failure: Failure },
    /// Cancellation acknowledged.
    JobIsCancelled { id: JobId },
}

impl WorkerReply {
    pub fn id(&self) -> &JobId {
        match self {
            WorkerReply::JobFileDownloading { id }
            | WorkerReply::JobStarted { id }
            | WorkerReply::WorkerIsBusy { id }
            | WorkerReply::JobSuccess { id, .. }
            | WorkerReply::JobFailure { id, .. }
            | WorkerReply::JobIsCancelled { id } => id,
        }
    }

    /// `true` for replies that end the caller's conversation about a job.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkerReply::JobSuccess { .. }
                | WorkerReply::JobFailure { .. }
                | WorkerReply::JobIsCancelled { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_replies() {
        let id = JobId::from("j1");
        assert!(!WorkerReply::JobFileDownloading { id: id.clone() }.is_terminal());
        assert!(!WorkerReply::JobStarted { id: id.clone() }.is_terminal());
        assert!(!WorkerReply::WorkerIsBusy { id: id.clone() }.is_terminal());
        assert!(WorkerReply::JobIsCancelled { id: id.clone() }.is_terminal());
        assert!(
            WorkerReply::JobFailure {
                id: id.clone(),
                failure: Failure::new("x")
            }
            .is_terminal()
        );
    }

    #[test]
    fn tagged_json() {
        let mut data = JobData::new();
        data.insert("x".into(), 1.into());
        let reply = WorkerReply::JobSuccess {
            id: "j1".into(),
            data,
        };
        let json = serde_json::to_string(&reply).unwrap();
        assert_eq!(json, r#"{"type":"jobSuccess","id":"j1","data":{"x":1}}"#);
        assert_eq!(reply.id(), "j1");
    }
}
