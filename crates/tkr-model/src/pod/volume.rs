use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmptyDirVolumeSource {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigMapVolumeSource {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretVolumeSource {
    #[serde(default)]
    pub secret_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistentVolumeClaimVolumeSource {
    pub claim_name: String,
    #[serde(default)]
    pub read_only: bool,
}

/// Named pod volume. Exactly one source field is expected to be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub empty_dir: Option<EmptyDirVolumeSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_map: Option<ConfigMapVolumeSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<SecretVolumeSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistent_volume_claim: Option<PersistentVolumeClaimVolumeSource>,
}

impl Volume {
    pub fn empty_dir<N: Into<String>>(name: N) -> Self {
        Self {
            name: name.into(),
            empty_dir: Some(EmptyDirVolumeSource {}),
            ..Default::default()
        }
    }

    pub fn config_map<N, C>(name: N, config_map: C) -> Self
    where
        N: Into<String>,
        C: Into<String>,
    {
        Self {
            name: name.into(),
            config_map: Some(ConfigMapVolumeSource {
                name: config_map.into(),
            }),
            ..Default::default()
        }
    }

    pub fn secret<N, S>(name: N, secret_name: S) -> Self
    where
        N: Into<String>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            secret: Some(SecretVolumeSource {
                secret_name: secret_name.into(),
            }),
            ..Default::default()
        }
    }

    pub fn claim<N, C>(name: N, claim_name: C) -> Self
    where
        N: Into<String>,
        C: Into<String>,
    {
        Self {
            name: name.into(),
            persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                claim_name: claim_name.into(),
                read_only: false,
            }),
            ..Default::default()
        }
    }

    /// Mutable references to every object name this volume points at.
    pub fn source_names_mut(&mut self) -> impl Iterator<Item = &mut String> {
        let cm = self.config_map.as_mut().map(|s| &mut s.name);
        let secret = self.secret.as_mut().map(|s| &mut s.secret_name);
        let claim = self
            .persistent_volume_claim
            .as_mut()
            .map(|s| &mut s.claim_name);
        cm.into_iter().chain(secret).chain(claim)
    }
}
