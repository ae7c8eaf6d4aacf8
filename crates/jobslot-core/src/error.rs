use jobslot_model::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("no runner for artifact kind {0}")]
    NoRunner(String),
    #[error("worker has stopped")]
    WorkerStopped,
    #[error(transparent)]
    InvalidRequest(#[from] ModelError),
}
