/// Tunables for a [`crate::Worker`].
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum number of trace lines kept in an execution failure report.
    pub trace_depth: usize,
    /// Job threads are named `<prefix>-<job id>`.
    pub thread_prefix: String,
}

impl WorkerConfig {
    pub fn with_trace_depth(mut self, depth: usize) -> Self {
        self.trace_depth = depth;
        self
    }

    pub fn with_thread_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_prefix = prefix.into();
        self
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            trace_depth: 10,
            thread_prefix: "jobslot-job".to_string(),
        }
    }
}
