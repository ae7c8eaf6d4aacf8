use serde::{Deserialize, Serialize};

use crate::{ArtifactRef, JobEnv, JobId, ModelError};

/// What to run: the artifact to fetch and how to invoke it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobParams {
    /// Reference passed to the downloader (path or URL).
    pub artifact: ArtifactRef,
    /// Invocation arguments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// Environment for the job body.
    #[serde(default, skip_serializing_if = "JobEnv::is_empty")]
    pub env: JobEnv,
}

impl JobParams {
    pub fn new(artifact: impl Into<ArtifactRef>) -> Self {
        Self {
            artifact: artifact.into(),
            args: Vec::new(),
            env: JobEnv::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_env(mut self, env: JobEnv) -> Self {
        self.env = env;
        self
    }
}

/// Immutable request to run one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRequest {
    pub id: JobId,
    pub params: JobParams,
}

impl JobRequest {
    pub fn new(id: impl Into<JobId>, params: JobParams) -> Self {
        Self {
            id: id.into(),
            params,
        }
    }

    /// Reject requests that can never be correlated or fetched.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.id.as_str().trim().is_empty() {
            return Err(ModelError::EmptyJobId);
        }
        if self.params.artifact.as_str().trim().is_empty() {
            return Err(ModelError::EmptyArtifactRef);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_blank_fields() {
        let ok = JobRequest::new("j1", JobParams::new("/opt/jobs/train.sh"));
        assert!(ok.validate().is_ok());

        let no_id = JobRequest::new("  ", JobParams::new("/opt/jobs/train.sh"));
        assert_eq!(no_id.validate(), Err(ModelError::EmptyJobId));

        let no_artifact = JobRequest::new("j1", JobParams::new(""));
        assert_eq!(no_artifact.validate(), Err(ModelError::EmptyArtifactRef));
    }

    #[test]
    fn request_json_shape() {
        let req = JobRequest::new(
            "j1",
            JobParams::new("fn://train").with_args(["--epochs", "3"]),
        );
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["id"], "j1");
        assert_eq!(json["params"]["artifact"], "fn://train");
        assert_eq!(json["params"]["args"][1], "3");
        assert!(json["params"].get("env").is_none());
    }
}
