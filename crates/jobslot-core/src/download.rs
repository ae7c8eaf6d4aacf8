use async_trait::async_trait;
use jobslot_model::{Artifact, ArtifactRef};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DownloadError {
    #[error("artifact not found: {0}")]
    NotFound(String),
    #[error("unsupported artifact reference: {0}")]
    Unsupported(String),
    #[error("artifact transfer failed: {0}")]
    Transfer(String),
}

impl From<std::io::Error> for DownloadError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => DownloadError::NotFound(e.to_string()),
            _ => DownloadError::Transfer(e.to_string()),
        }
    }
}

/// Fetches the artifact a job needs.
///
/// Retry policy, if any, lives here; the worker reports the first error it gets.
#[async_trait]
pub trait Downloader: Send + Sync + 'static {
    async fn download(&self, reference: &ArtifactRef) -> Result<Artifact, DownloadError>;

    /// Drop whatever was staged for `artifact`. Called once the job that used it has left the slot.
    fn release(&self, _artifact: &Artifact) {}

    /// Release downloader resources. Called once when the worker terminates.
    fn stop(&self) {}
}
