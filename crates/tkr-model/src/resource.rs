use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{ModelError, ObjectMeta};

/// Kind of data a pipeline resource represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    /// Source repository checked out into the workspace.
    Git,
    /// Container image reference.
    Image,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Git => "git",
            ResourceType::Image => "image",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = ModelError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "git" => Ok(Self::Git),
            "image" => Ok(Self::Image),
            _ => Err(ModelError::UnknownResourceType(s.to_string())),
        }
    }
}

/// Name/value pair used for run parameters and resource parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

impl Param {
    pub fn new<N, V>(name: N, value: V) -> Self
    where
        N: Into<String>,
        V: Into<String>,
    {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Typed resource description, either stored or embedded in a binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineResourceSpec {
    #[serde(rename = "type")]
    pub type_: ResourceType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Param>,
}

impl PipelineResourceSpec {
    pub fn new(type_: ResourceType) -> Self {
        Self {
            type_,
            params: Vec::new(),
        }
    }

    pub fn with_param<N, V>(mut self, name: N, value: V) -> Self
    where
        N: Into<String>,
        V: Into<String>,
    {
        self.params.push(Param::new(name, value));
        self
    }

    /// Parameter value by case-insensitive name (`URL` and `url` are the same key).
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .map(|p| p.value.as_str())
    }
}

/// Stored, reusable resource definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineResource {
    pub metadata: ObjectMeta,
    pub spec: PipelineResourceSpec,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_lookup_is_case_insensitive() {
        let spec = PipelineResourceSpec::new(ResourceType::Git)
            .with_param("URL", "https://foo.git")
            .with_param("revision", "rel-can");

        assert_eq!(spec.param("url"), Some("https://foo.git"));
        assert_eq!(spec.param("Revision"), Some("rel-can"));
        assert!(spec.param("digest").is_none());
    }

    #[test]
    fn resource_type_parses_and_serializes_lowercase() {
        assert_eq!("GIT".parse::<ResourceType>().unwrap(), ResourceType::Git);
        assert!("cluster".parse::<ResourceType>().is_err());

        let json = serde_json::to_string(&ResourceType::Image).unwrap();
        assert_eq!(json, r#""image""#);
    }
}
