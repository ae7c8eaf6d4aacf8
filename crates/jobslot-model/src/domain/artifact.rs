use std::{fmt, path::PathBuf};

use serde::{Deserialize, Serialize};

/// Reference to a downloadable artifact (filesystem path, `file://` or `fn://` URL).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactRef(String);

impl ArtifactRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ArtifactRef {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ArtifactRef {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Packaging of a fetched artifact; decides which runner can execute it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ArtifactKind {
    /// Function registered inside the worker process.
    Fn { name: String },
    /// Native executable staged on local disk.
    Exec { program: PathBuf },
    /// Script run through the platform shell.
    Script { path: PathBuf },
}

impl ArtifactKind {
    /// Short symbolic identifier, used for logging and routing.
    pub fn kind(&self) -> &'static str {
        match self {
            ArtifactKind::Fn { .. } => "fn",
            ArtifactKind::Exec { .. } => "exec",
            ArtifactKind::Script { .. } => "script",
        }
    }
}

/// A fetched artifact, ready to be handed to a runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub reference: ArtifactRef,
    pub kind: ArtifactKind,
    /// Size in bytes of the staged payload (zero for in-process functions).
    #[serde(default)]
    pub size: u64,
}

impl Artifact {
    pub fn function(reference: impl Into<ArtifactRef>, name: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            kind: ArtifactKind::Fn { name: name.into() },
            size: 0,
        }
    }
}
