use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoggerError {
    #[error("unknown log format {0:?} (expected text, json or journald)")]
    UnknownFormat(String),
    #[error("journald output needs linux and the `journald` feature")]
    JournaldUnavailable,
    #[error("journald: {0}")]
    Journald(String),
    #[error("log filter {filter:?} is invalid: {reason}")]
    BadFilter { filter: String, reason: String },
    #[error("a global log subscriber is already installed")]
    AlreadyInstalled,
}
