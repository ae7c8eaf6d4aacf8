use serde::{Deserialize, Serialize};

use crate::JobParams;

/// Terminal failure report for a job.
///
/// `message` is always present; the remaining fields are diagnostics and are only filled for execution errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Failure {
    pub message: String,
    /// Type name of the error raised by the job body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Truncated cause chain and frame summary.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trace: Vec<String>,
    /// Parameters of the failed request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<JobParams>,
}

impl Failure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: None,
            trace: Vec::new(),
            params: None,
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_trace(mut self, trace: Vec<String>) -> Self {
        self.trace = trace;
        self
    }

    pub fn with_params(mut self, params: JobParams) -> Self {
        self.params = Some(params);
        self
    }
}

impl From<&str> for Failure {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}
