use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("job id must not be empty")]
    EmptyJobId,
    #[error("artifact reference must not be empty")]
    EmptyArtifactRef,
}
