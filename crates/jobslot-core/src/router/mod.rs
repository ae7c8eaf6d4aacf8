use std::sync::Arc;

use jobslot_model::Artifact;
use tracing::{instrument, trace};

use crate::runner::Runner;

/// Picks the runner for a fetched artifact. Pure lookup.
pub trait RunnerSelector: Send + Sync + 'static {
    fn select(&self, artifact: &Artifact) -> Option<Arc<dyn Runner>>;
}

/// Ordered runner list; the first runner that supports an artifact wins.
#[derive(Default)]
pub struct RunnerRouter {
    runners: Vec<Arc<dyn Runner>>,
}

impl RunnerRouter {
    #[inline]
    pub fn new() -> Self {
        Self {
            runners: Vec::new(),
        }
    }

    #[inline]
    pub fn register(&mut self, runner: Arc<dyn Runner>) {
        self.runners.push(runner);
    }

    #[inline]
    pub fn with(mut self, runner: Arc<dyn Runner>) -> Self {
        self.register(runner);
        self
    }

    pub fn pick(&self, artifact: &Artifact) -> Option<&Arc<dyn Runner>> {
        self.runners.iter().find(|r| r.supports(artifact))
    }

    pub fn len(&self) -> usize {
        self.runners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runners.is_empty()
    }
}

impl RunnerSelector for RunnerRouter {
    #[instrument(level = "trace", skip(self, artifact), fields(kind = artifact.kind.kind()))]
    fn select(&self, artifact: &Artifact) -> Option<Arc<dyn Runner>> {
        let runner = self.pick(artifact)?;
        trace!(runner = runner.name(), "runner selected");
        Some(Arc::clone(runner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{RunContext, RunError};
    use jobslot_model::{ArtifactKind, JobData, JobRequest};

    struct Named(&'static str, &'static str);

    impl Runner for Named {
        fn name(&self) -> &'static str {
            self.0
        }
        fn supports(&self, artifact: &Artifact) -> bool {
            artifact.kind.kind() == self.1
        }
        fn run(&self, _job: &JobRequest, _ctx: &RunContext<'_>) -> Result<JobData, RunError> {
            Ok(JobData::new())
        }
    }

    #[test]
    fn first_supporting_runner_wins() {
        let router = RunnerRouter::new()
            .with(Arc::new(Named("fn-a", "fn")))
            .with(Arc::new(Named("fn-b", "fn")))
            .with(Arc::new(Named("exec", "exec")));

        let picked = router.select(&Artifact::function("fn://x", "x")).unwrap();
        assert_eq!(picked.name(), "fn-a");

        let exec = Artifact {
            reference: "/bin/true".into(),
            kind: ArtifactKind::Exec {
                program: "/bin/true".into(),
            },
            size: 0,
        };
        assert_eq!(router.select(&exec).unwrap().name(), "exec");
    }

    #[test]
    fn no_runner_for_unknown_kind() {
        let router = RunnerRouter::new().with(Arc::new(Named("exec", "exec")));
        assert!(router.select(&Artifact::function("fn://x", "x")).is_none());
        assert_eq!(router.len(), 1);
    }
}
