use tracing_subscriber::{
    EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::logger::{
    config::LoggerConfig,
    error::{LoggerError, LoggerResult},
    object::{LoggerFormat, LoggerRfc3339},
};

/// Identifier journald entries are tagged with.
#[cfg(target_os = "linux")]
const SYSLOG_IDENTIFIER: &str = "tkr";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Build the output layer for `cfg.format`, already filtered by `cfg.level`.
pub(crate) fn output_layer(cfg: &LoggerConfig) -> LoggerResult<BoxedLayer> {
    let filter = cfg.level.to_env_filter();
    let layer: BoxedLayer = match cfg.format {
        LoggerFormat::Text => fmt::layer()
            .with_ansi(cfg.should_use_color())
            .with_target(cfg.with_targets)
            .with_timer(LoggerRfc3339)
            .with_filter(filter)
            .boxed(),
        // span fields (namespace, name, run) end up under `span` and `spans`
        LoggerFormat::Json => fmt::layer()
            .json()
            .with_ansi(false)
            .with_target(cfg.with_targets)
            .with_current_span(true)
            .with_span_list(true)
            .with_timer(LoggerRfc3339)
            .with_filter(filter)
            .boxed(),
        LoggerFormat::Journald => journald_layer(filter)?,
    };
    Ok(layer)
}

#[cfg(target_os = "linux")]
fn journald_layer(filter: EnvFilter) -> LoggerResult<BoxedLayer> {
    let layer = tracing_journald::layer()
        .map_err(|e| LoggerError::JournaldInitFailed(e.to_string()))?
        .with_syslog_identifier(SYSLOG_IDENTIFIER.to_string());
    Ok(layer.with_filter(filter).boxed())
}

#[cfg(not(target_os = "linux"))]
fn journald_layer(_filter: EnvFilter) -> LoggerResult<BoxedLayer> {
    Err(LoggerError::JournaldNotSupported)
}

/// Install `layer` on a fresh registry as the global default.
pub(crate) fn install(layer: BoxedLayer) -> LoggerResult<()> {
    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .map_err(|_| LoggerError::AlreadyInitialized)
}
