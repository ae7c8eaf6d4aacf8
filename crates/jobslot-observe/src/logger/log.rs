use time::{UtcOffset, format_description::well_known::Rfc3339};
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, fmt::time::OffsetTime, layer::SubscriberExt};

use crate::{
    logger::{config::LoggerConfig, error::LoggerError, format::LoggerFormat},
    sink::{SinkLayer, SinkRegistry},
};

const TARGET: &str = "jobslot.observe.logger";

pub(super) fn install(cfg: &LoggerConfig) -> Result<SinkRegistry, LoggerError> {
    if !cfg.format.is_supported() {
        return Err(LoggerError::JournaldUnavailable);
    }
    let filter = EnvFilter::try_new(&cfg.filter).map_err(|e| LoggerError::BadFilter {
        filter: cfg.filter.clone(),
        reason: e.to_string(),
    })?;

    let text = (cfg.format == LoggerFormat::Text).then(|| {
        fmt::layer()
            .with_ansi(cfg.use_color)
            .with_target(cfg.with_targets)
            .with_timer(timer())
    });
    let json = (cfg.format == LoggerFormat::Json).then(|| {
        fmt::layer()
            .json()
            .with_ansi(false)
            .with_target(cfg.with_targets)
            .with_timer(timer())
    });

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(SinkLayer::new(cfg.sinks.clone()))
        .with(text)
        .with(json)
        .with(journald(cfg.format)?);
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|_| LoggerError::AlreadyInstalled)?;

    debug!(target: TARGET, format = %cfg.format, filter = %cfg.filter, "logger installed");
    Ok(cfg.sinks.clone())
}

fn timer() -> OffsetTime<Rfc3339> {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    OffsetTime::new(offset, Rfc3339)
}

#[cfg(all(target_os = "linux", feature = "journald"))]
fn journald(format: LoggerFormat) -> Result<Option<tracing_journald::Layer>, LoggerError> {
    if format != LoggerFormat::Journald {
        return Ok(None);
    }
    tracing_journald::layer()
        .map(Some)
        .map_err(|e| LoggerError::Journald(e.to_string()))
}

#[cfg(not(all(target_os = "linux", feature = "journald")))]
fn journald(_format: LoggerFormat) -> Result<Option<tracing_subscriber::layer::Identity>, LoggerError> {
    Ok(None)
}
