//! Controller configuration: helper images, the default run timeout and the
//! entrypoint seed table.
use std::{collections::BTreeMap, path::Path};

use serde::{Deserialize, Serialize};
use tkr_model::GoDuration;

use crate::error::ConfigError;

/// Images of the helper containers injected into every pod.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImagesConfig {
    /// Credentials initializer.
    pub creds_init: String,
    /// Image carrying the entrypoint helper binary.
    pub entrypoint: String,
    /// Terminal sentinel.
    pub nop: String,
    /// Git fetcher used for git inputs.
    pub git_init: String,
    /// Shell image used for shared-volume transfers.
    pub bash_noop: String,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            creds_init: "override-with-creds:latest".into(),
            entrypoint: "override-with-entrypoint:latest".into(),
            nop: "override-with-nop:latest".into(),
            git_init: "override-with-git:latest".into(),
            bash_noop: "override-with-bash-noop:latest".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ControllerConfig {
    pub images: ImagesConfig,
    /// Applied to runs that set no timeout of their own.
    pub default_timeout: GoDuration,
    /// Known image entrypoints, loaded into the cache at startup.
    pub entrypoints: BTreeMap<String, Vec<String>>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            images: ImagesConfig::default(),
            default_timeout: GoDuration::from_mins(60),
            entrypoints: BTreeMap::new(),
        }
    }
}

impl ControllerConfig {
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }
}
