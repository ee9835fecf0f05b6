use std::io::IsTerminal;

use serde::{Deserialize, Serialize};

use crate::logger::{
    error::LoggerResult,
    object::{LoggerFormat, LoggerLevel},
};

/// Environment variable overriding [`LoggerConfig::level`].
pub const ENV_LOG_LEVEL: &str = "TKR_LOG";
/// Environment variable overriding [`LoggerConfig::format`].
pub const ENV_LOG_FORMAT: &str = "TKR_LOG_FORMAT";

/// Logger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoggerConfig {
    /// Output format.
    pub format: LoggerFormat,
    /// Filter expression (e.g. `"info"`, `"tkr_core=debug,info"`).
    pub level: LoggerLevel,
    /// Include module targets in log lines.
    pub with_targets: bool,
    /// Colored text output; only honoured when stdout is a terminal.
    pub use_color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            format: LoggerFormat::default(),
            level: LoggerLevel::default(),
            with_targets: true,
            use_color: true,
        }
    }
}

impl LoggerConfig {
    /// Whether text output should carry ANSI colors.
    ///
    /// Call this while installing the subscriber, not while parsing config, so the
    /// terminal check sees the real stdout.
    pub fn should_use_color(&self) -> bool {
        self.use_color && std::io::stdout().is_terminal()
    }

    /// Apply [`ENV_LOG_LEVEL`] and [`ENV_LOG_FORMAT`] from the process environment.
    pub fn with_env_overrides(self) -> LoggerResult<Self> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup. Empty values are ignored.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> LoggerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(level) = get(ENV_LOG_LEVEL) {
            self.level = level.parse()?;
        }
        if let Some(format) = get(ENV_LOG_FORMAT) {
            self.format = format.parse()?;
        }
        Ok(self)
    }
}
