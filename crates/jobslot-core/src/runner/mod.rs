use std::fmt;

use jobslot_model::{Artifact, JobData, JobRequest};
use thiserror::Error;

use crate::{engine::ExecutionContext, task::Interrupt};

/// Adapter able to execute one kind of artifact.
///
/// `run` is called on the job's dedicated thread and may block.
/// Long-running bodies should poll [`Interrupt`] at safe points and return [`RunError::Interrupted`] when it fires.
pub trait Runner: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    fn supports(&self, artifact: &Artifact) -> bool;

    fn run(&self, job: &JobRequest, ctx: &RunContext<'_>) -> Result<JobData, RunError>;
}

/// Everything a runner sees while executing a job.
pub struct RunContext<'a> {
    pub artifact: &'a Artifact,
    pub interrupt: &'a Interrupt,
    pub engine: &'a dyn ExecutionContext,
}

#[derive(Debug, Error)]
pub enum RunError {
    /// The body observed cooperative interruption.
    #[error("execution was cancelled")]
    Interrupted,
    #[error("{error}")]
    Failed {
        /// Type name of the original error.
        kind: &'static str,
        error: anyhow::Error,
    },
}

impl RunError {
    /// Wrap any error raised by a job body, remembering its type name.
    pub fn failed<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        RunError::Failed {
            kind: std::any::type_name::<E>(),
            error: anyhow::Error::new(err),
        }
    }

    /// Failure carrying only a message.
    pub fn msg<M>(message: M) -> Self
    where
        M: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        RunError::Failed {
            kind: "message",
            error: anyhow::Error::msg(message),
        }
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, RunError::Interrupted)
    }
}

impl From<anyhow::Error> for RunError {
    fn from(error: anyhow::Error) -> Self {
        RunError::Failed {
            kind: "anyhow::Error",
            error,
        }
    }
}

impl From<std::io::Error> for RunError {
    fn from(e: std::io::Error) -> Self {
        RunError::failed(e)
    }
}
