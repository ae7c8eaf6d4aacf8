use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("unsupported artifact kind for this runner: {0}")]
    UnsupportedKind(&'static str),
    #[error("no function registered as {0:?}")]
    UnknownFunction(String),
    #[error("non-zero exit code: {code}")]
    NonZeroExit { code: i32, stdout: String },
    #[error("spawn failed: {0}")]
    Spawn(String),
    #[error("killed by signal")]
    KilledBySignal,
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ExecError {
    fn from(e: std::io::Error) -> Self {
        ExecError::Io(e.to_string())
    }
}

pub type ExecResult<T> = Result<T, ExecError>;
