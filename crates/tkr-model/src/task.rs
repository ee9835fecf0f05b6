use serde::{Deserialize, Serialize};

use crate::{Container, ObjectMeta, ResourceType, Volume};

/// Resource slot declared by a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResource {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: ResourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_path: Option<String>,
}

impl TaskResource {
    pub fn new<N: Into<String>>(name: N, type_: ResourceType) -> Self {
        Self {
            name: name.into(),
            type_,
            target_path: None,
        }
    }
}

/// Parameter declared by a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl ParamSpec {
    pub fn required<N: Into<String>>(name: N) -> Self {
        Self {
            name: name.into(),
            description: None,
            default: None,
        }
    }

    pub fn with_default<N, D>(name: N, default: D) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        Self {
            name: name.into(),
            description: None,
            default: Some(default.into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inputs {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<TaskResource>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<ParamSpec>,
}

impl Inputs {
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty() && self.params.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outputs {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<TaskResource>,
}

impl Outputs {
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// Task body: declared slots and parameters, ordered steps, volumes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSpec {
    #[serde(default, skip_serializing_if = "Inputs::is_empty")]
    pub inputs: Inputs,
    #[serde(default, skip_serializing_if = "Outputs::is_empty")]
    pub outputs: Outputs,
    #[serde(default)]
    pub steps: Vec<Container>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<Volume>,
}

impl TaskSpec {
    pub fn with_step(mut self, step: Container) -> Self {
        self.steps.push(step);
        self
    }

    pub fn with_input(mut self, slot: TaskResource) -> Self {
        self.inputs.resources.push(slot);
        self
    }

    pub fn with_output(mut self, slot: TaskResource) -> Self {
        self.outputs.resources.push(slot);
        self
    }

    pub fn with_param(mut self, param: ParamSpec) -> Self {
        self.inputs.params.push(param);
        self
    }

    pub fn with_volume(mut self, volume: Volume) -> Self {
        self.volumes.push(volume);
        self
    }
}

/// Namespaced task definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: TaskSpec,
}

/// Cluster-scoped task definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterTask {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: TaskSpec,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_task_with_inputs_and_defaults() {
        let json = r#"{
            "metadata": {"name": "build", "namespace": "foo"},
            "spec": {
                "inputs": {
                    "resources": [{"name": "workspace", "type": "git"}],
                    "params": [{"name": "flags", "default": "-v"}]
                },
                "steps": [{"name": "compile", "image": "gcc", "command": ["make"]}]
            }
        }"#;

        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.spec.inputs.resources[0].type_, ResourceType::Git);
        assert_eq!(task.spec.inputs.params[0].default.as_deref(), Some("-v"));
        assert!(task.spec.outputs.is_empty());
        assert_eq!(task.spec.steps.len(), 1);
    }

    #[test]
    fn empty_sections_are_omitted() {
        let spec = TaskSpec::default().with_step(Container::new("s", "img"));
        let json = serde_json::to_value(&spec).unwrap();

        assert!(json.get("inputs").is_none());
        assert!(json.get("outputs").is_none());
        assert!(json.get("volumes").is_none());
    }
}
