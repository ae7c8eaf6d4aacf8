use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

use jobslot_core::{RunContext, RunError, Runner};
use jobslot_model::{Artifact, ArtifactKind, JobData, JobRequest};
use tracing::{debug, trace};

use crate::error::ExecError;

const TARGET: &str = "jobslot.exec.fn";

/// Body of a registered function. Runs on the job thread and may block.
pub type JobFn = Arc<dyn Fn(&JobRequest, &RunContext<'_>) -> Result<JobData, RunError> + Send + Sync>;

/// Runner for in-process functions (`fn://name` artifacts).
///
/// Functions must be registered before a job references them; the artifact's function name is the lookup key.
pub struct FnRunner {
    name: &'static str,
    registry: RwLock<HashMap<String, JobFn>>,
}

impl FnRunner {
    pub fn new() -> Self {
        Self::with_name("fn")
    }

    pub fn with_name(name: &'static str) -> Self {
        Self {
            name,
            registry: RwLock::new(HashMap::new()),
        }
    }

    /// Register `body` under `name`, replacing any previous registration.
    pub fn register<F>(&self, name: impl Into<String>, body: F) -> &Self
    where
        F: Fn(&JobRequest, &RunContext<'_>) -> Result<JobData, RunError> + Send + Sync + 'static,
    {
        let name = name.into();
        trace!(target: TARGET, function = %name, "function registered");
        self.registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, Arc::new(body));
        self
    }

    pub fn unregister(&self, name: &str) -> bool {
        self.registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
            .is_some()
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    pub fn count(&self) -> usize {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn lookup(&self, name: &str) -> Option<JobFn> {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }
}

impl Default for FnRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl Runner for FnRunner {
    fn name(&self) -> &'static str {
        self.name
    }

    fn supports(&self, artifact: &Artifact) -> bool {
        matches!(artifact.kind, ArtifactKind::Fn { .. })
    }

    fn run(&self, job: &JobRequest, ctx: &RunContext<'_>) -> Result<JobData, RunError> {
        let ArtifactKind::Fn { name } = &ctx.artifact.kind else {
            return Err(RunError::failed(ExecError::UnsupportedKind(
                ctx.artifact.kind.kind(),
            )));
        };

        // the lock is not held while the body runs
        let body = self
            .lookup(name)
            .ok_or_else(|| RunError::failed(ExecError::UnknownFunction(name.clone())))?;

        debug!(target: TARGET, job_id = %job.id, function = %name, "calling function");
        body(job, ctx)
    }
}
