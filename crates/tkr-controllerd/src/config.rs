use std::{net::SocketAddr, path::Path, time::Duration};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use tkr_core::config::ControllerConfig;
use tkr_model::GoDuration;
use tkr_observe::LoggerConfig;

/// Daemon configuration file.
///
/// Every section is optional; an empty object is a valid config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DaemonConfig {
    pub logger: LoggerConfig,
    pub controller: ControllerConfig,
    /// Listen address for `/metrics` and `/healthz`.
    pub metrics_addr: SocketAddr,
    /// Period between full resync passes over all runs.
    pub resync_interval: GoDuration,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            logger: LoggerConfig::default(),
            controller: ControllerConfig::default(),
            metrics_addr: SocketAddr::from(([127, 0, 0, 1], 9464)),
            resync_interval: GoDuration::from_secs(30),
        }
    }
}

impl DaemonConfig {
    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        serde_json::from_str(raw).context("invalid daemon config")
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_json(&raw)
    }

    /// Resync period, never shorter than one second.
    pub fn resync_period(&self) -> Duration {
        self.resync_interval.as_std().max(Duration::from_secs(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tkr_observe::LoggerFormat;

    #[test]
    fn empty_object_gives_defaults() {
        let cfg = DaemonConfig::from_json("{}").unwrap();
        assert_eq!(cfg.metrics_addr.port(), 9464);
        assert_eq!(cfg.resync_period(), Duration::from_secs(30));
        assert_eq!(cfg.controller, ControllerConfig::default());
    }

    #[test]
    fn nested_sections_are_parsed() {
        let cfg = DaemonConfig::from_json(
            r#"{
                "logger": {"format": "json", "level": "tkr_core=debug,info"},
                "controller": {"defaultTimeout": "15m"},
                "metricsAddr": "0.0.0.0:9000",
                "resyncInterval": "5s"
            }"#,
        )
        .unwrap();

        assert_eq!(cfg.logger.format, LoggerFormat::Json);
        assert_eq!(cfg.controller.default_timeout, GoDuration::from_mins(15));
        assert_eq!(cfg.metrics_addr.to_string(), "0.0.0.0:9000");
        assert_eq!(cfg.resync_period(), Duration::from_secs(5));
    }

    #[test]
    fn tiny_resync_is_clamped() {
        let cfg = DaemonConfig::from_json(r#"{"resyncInterval": "10ms"}"#).unwrap();
        assert_eq!(cfg.resync_period(), Duration::from_secs(1));
    }

    #[test]
    fn bad_address_is_rejected() {
        assert!(DaemonConfig::from_json(r#"{"metricsAddr": "nowhere"}"#).is_err());
    }
}
