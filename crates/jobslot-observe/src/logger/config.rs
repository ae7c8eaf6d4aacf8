use crate::{
    logger::{error::LoggerError, format::LoggerFormat},
    sink::SinkRegistry,
};

/// Filter directives for the worker process, in `EnvFilter` syntax.
pub const FILTER_ENV: &str = "JOBSLOT_LOG";
/// One of `text`, `json`, `journald`.
pub const FORMAT_ENV: &str = "JOBSLOT_LOG_FORMAT";

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub format: LoggerFormat,
    /// `EnvFilter` directives, e.g. `info,jobslot.core=debug`.
    pub filter: String,
    pub with_targets: bool,
    pub use_color: bool,
    /// Root that job sinks are attached to.
    pub sinks: SinkRegistry,
}

impl LoggerConfig {
    /// Defaults overridden by [`FILTER_ENV`] and [`FORMAT_ENV`] when set.
    pub fn from_env() -> Result<Self, LoggerError> {
        Self::default().with_vars(|key| std::env::var(key).ok())
    }

    fn with_vars(mut self, var: impl Fn(&str) -> Option<String>) -> Result<Self, LoggerError> {
        if let Some(filter) = var(FILTER_ENV).filter(|f| !f.trim().is_empty()) {
            self.filter = filter;
        }
        if let Some(format) = var(FORMAT_ENV) {
            self.format = format.parse()?;
        }
        Ok(self)
    }

    pub fn with_format(mut self, format: LoggerFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    pub fn with_sinks(mut self, sinks: SinkRegistry) -> Self {
        self.sinks = sinks;
        self
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            format: LoggerFormat::Text,
            filter: "info".to_string(),
            with_targets: true,
            use_color: atty::is(atty::Stream::Stdout),
            sinks: SinkRegistry::new(),
        }
    }
}
