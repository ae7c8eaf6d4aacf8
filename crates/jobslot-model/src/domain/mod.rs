mod kv;
pub use kv::KeyValue;

mod job_env;
pub use job_env::JobEnv;

mod job_id;
pub use job_id::JobId;

mod job_request;
pub use job_request::{JobParams, JobRequest};

mod artifact;
pub use artifact::{Artifact, ArtifactKind, ArtifactRef};

mod failure;
pub use failure::Failure;

mod reply;
pub use reply::WorkerReply;

mod worker_state;
pub use worker_state::WorkerState;

/// Structured result produced by a successful job.
///
/// Arbitrary keyed content: scalars, arrays and nested objects.
pub type JobData = serde_json::Map<String, serde_json::Value>;
