use serde::{Deserialize, Serialize};

use crate::ObjectMeta;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectReference {
    pub name: String,
}

/// Identity a pod runs as, listing the secrets it may mount.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAccount {
    pub metadata: ObjectMeta,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secrets: Vec<ObjectReference>,
}

impl ServiceAccount {
    pub fn new<N, M>(namespace: N, name: M) -> Self
    where
        N: Into<String>,
        M: Into<String>,
    {
        Self {
            metadata: ObjectMeta::new(namespace, name),
            secrets: Vec::new(),
        }
    }

    pub fn with_secret<S: Into<String>>(mut self, name: S) -> Self {
        self.secrets.push(ObjectReference { name: name.into() });
        self
    }
}

/// Secret metadata; payload bytes never pass through the reconciler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secret {
    pub metadata: ObjectMeta,
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub type_: String,
}

impl Secret {
    pub fn new<N, M, T>(namespace: N, name: M, type_: T) -> Self
    where
        N: Into<String>,
        M: Into<String>,
        T: Into<String>,
    {
        Self {
            metadata: ObjectMeta::new(namespace, name),
            type_: type_.into(),
        }
    }

    pub fn with_annotation<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.metadata.annotations.insert(key, value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_type_and_annotations_roundtrip() {
        let secret = Secret::new("foo", "git-creds", "kubernetes.io/basic-auth")
            .with_annotation("tekton.dev/git-0", "https://github.com");
        let json = serde_json::to_value(&secret).unwrap();

        assert_eq!(json["type"], "kubernetes.io/basic-auth");
        assert_eq!(
            json["metadata"]["annotations"]["tekton.dev/git-0"],
            "https://github.com"
        );

        let back: Secret = serde_json::from_value(json).unwrap();
        assert_eq!(back, secret);
    }
}
