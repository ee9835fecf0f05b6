use serde::{Deserialize, Serialize};

/// Single container environment variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvVar {
    /// Variable name.
    pub name: String,
    /// Literal value.
    #[serde(default)]
    pub value: String,
}

impl EnvVar {
    /// Create a new variable.
    pub fn new<K, V>(name: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl From<(&str, &str)> for EnvVar {
    fn from((name, value): (&str, &str)) -> Self {
        Self::new(name, value)
    }
}

/// Ordered list of environment variables attached to a container.
///
/// Serialized as a transparent array, the same shape a pod spec uses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Env(pub Vec<EnvVar>);

impl Env {
    /// Create an empty environment.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EnvVar> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut EnvVar> {
        self.0.iter_mut()
    }

    /// Get the value for a name, returning the last matching entry.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .rev()
            .find(|v| v.name == name)
            .map(|v| v.value.as_str())
    }

    /// Append a variable. Later entries win in [`Env::get`].
    pub fn push<K, V>(&mut self, name: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.0.push(EnvVar::new(name, value));
    }

    /// Concatenate two environments, `other` last.
    pub fn merged(&self, other: &Env) -> Env {
        let mut out = self.0.clone();
        out.extend(other.0.iter().cloned());
        Env(out)
    }
}

impl FromIterator<EnvVar> for Env {
    fn from_iter<I: IntoIterator<Item = EnvVar>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_override_last_wins() {
        let mut env = Env::new();
        env.push("HOME", "/root");
        env.push("PATH", "/bin");
        env.push("HOME", "/builder/home");

        assert_eq!(env.len(), 3);
        assert_eq!(env.get("HOME"), Some("/builder/home"));
        assert_eq!(env.get("PATH"), Some("/bin"));
        assert!(env.get("USER").is_none());
    }

    #[test]
    fn merged_keeps_order() {
        let base: Env = [EnvVar::new("A", "1")].into_iter().collect();
        let other: Env = [EnvVar::new("B", "2")].into_iter().collect();

        let merged = base.merged(&other);
        let names: Vec<_> = merged.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, ["A", "B"]);
    }

    #[test]
    fn serializes_as_pod_env_array() {
        let mut env = Env::new();
        env.push("HOME", "/builder/home");

        let json = serde_json::to_string(&env).unwrap();
        assert_eq!(json, r#"[{"name":"HOME","value":"/builder/home"}]"#);

        let back: Env = serde_json::from_str(&json).unwrap();
        assert_eq!(back, env);
    }
}
