mod config;
mod error;
mod log;
mod object;

pub use config::{ENV_LOG_FORMAT, ENV_LOG_LEVEL, LoggerConfig};
pub use error::{LoggerError, LoggerResult};
pub use object::{LoggerFormat, LoggerLevel, LoggerRfc3339};

/// Installs the global tracing subscriber described by `cfg`.
///
/// Fails with [`LoggerError::AlreadyInitialized`] when a global subscriber is
/// already set.
///
/// # Examples
/// ```rust
/// use tkr_observe::{LoggerConfig, init_logger};
///
/// let config = LoggerConfig::default();
/// if init_logger(&config).is_ok() {
///     tracing::info!("logger ready");
/// }
/// ```
pub fn init_logger(cfg: &LoggerConfig) -> LoggerResult<()> {
    log::install(log::output_layer(cfg)?)
}
