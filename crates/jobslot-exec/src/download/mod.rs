use std::path::{Path, PathBuf};

use async_trait::async_trait;
use jobslot_core::{DownloadError, Downloader};
use jobslot_model::{Artifact, ArtifactKind, ArtifactRef};
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::util::make_executable;

const TARGET: &str = "jobslot.exec.download";

const FN_SCHEME: &str = "fn://";
const FILE_SCHEME: &str = "file://";
const SCRIPT_EXTENSIONS: &[&str] = &["sh", "cmd", "bat"];

/// Stages local files as job artifacts.
///
/// `fn://name` resolves to an in-process function without touching the disk.
/// A plain path or `file://` URL is copied into its own directory under the staging root; the copy is classified as a script by extension and as an executable otherwise.
/// Any other scheme is unsupported.
#[derive(Debug, Clone)]
pub struct LocalDownloader {
    staging: PathBuf,
}

impl LocalDownloader {
    pub fn new(staging: impl Into<PathBuf>) -> Self {
        Self {
            staging: staging.into(),
        }
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging
    }

    async fn stage(&self, reference: &ArtifactRef, source: &Path) -> Result<Artifact, DownloadError> {
        let meta = tokio::fs::metadata(source)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => DownloadError::NotFound(reference.to_string()),
                _ => DownloadError::from(e),
            })?;
        if !meta.is_file() {
            return Err(DownloadError::Unsupported(reference.to_string()));
        }
        let file_name = source
            .file_name()
            .ok_or_else(|| DownloadError::Unsupported(reference.to_string()))?;

        let dir = self.staging.join(Uuid::new_v4().to_string());
        tokio::fs::create_dir_all(&dir).await?;
        let target = dir.join(file_name);
        let size = tokio::fs::copy(source, &target).await?;
        trace!(target: TARGET, from = %source.display(), to = %target.display(), size, "staged");

        let kind = if is_script(&target) {
            ArtifactKind::Script { path: target }
        } else {
            make_executable(&target)?;
            ArtifactKind::Exec { program: target }
        };

        Ok(Artifact {
            reference: reference.clone(),
            kind,
            size,
        })
    }
}

#[async_trait]
impl Downloader for LocalDownloader {
    async fn download(&self, reference: &ArtifactRef) -> Result<Artifact, DownloadError> {
        let raw = reference.as_str();

        if let Some(name) = raw.strip_prefix(FN_SCHEME) {
            if name.is_empty() {
                return Err(DownloadError::Unsupported(raw.to_string()));
            }
            debug!(target: TARGET, function = name, "resolved function artifact");
            return Ok(Artifact::function(reference.clone(), name));
        }

        let path = match raw.strip_prefix(FILE_SCHEME) {
            Some(path) => path,
            None if raw.contains("://") => return Err(DownloadError::Unsupported(raw.to_string())),
            None => raw,
        };

        let artifact = self.stage(reference, Path::new(path)).await?;
        debug!(target: TARGET, reference = raw, kind = artifact.kind.kind(), size = artifact.size, "artifact ready");
        Ok(artifact)
    }

    /// Removes the artifact's own staging directory; functions have none.
    fn release(&self, artifact: &Artifact) {
        let staged = match &artifact.kind {
            ArtifactKind::Exec { program } => program,
            ArtifactKind::Script { path } => path,
            _ => return,
        };
        let Some(dir) = staged
            .parent()
            .filter(|dir| dir.parent() == Some(self.staging.as_path()))
        else {
            trace!(target: TARGET, path = %staged.display(), "not staged here; nothing to release");
            return;
        };
        match std::fs::remove_dir_all(dir) {
            Ok(()) => trace!(target: TARGET, dir = %dir.display(), "artifact released"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(target: TARGET, dir = %dir.display(), error = %e, "artifact cleanup failed"),
        }
    }

    /// Removes every staged artifact.
    fn stop(&self) {
        match std::fs::remove_dir_all(&self.staging) {
            Ok(()) => debug!(target: TARGET, dir = %self.staging.display(), "staging removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(target: TARGET, dir = %self.staging.display(), error = %e, "staging cleanup failed"),
        }
    }
}

fn is_script(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SCRIPT_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}
