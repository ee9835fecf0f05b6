use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Condition, Conditions, ContainerState, GoDuration, ObjectMeta, Param, PipelineResourceSpec,
    TaskSpec,
};

/// Which store a named task reference points into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskKind {
    /// Namespaced task in the run's namespace.
    #[default]
    Task,
    /// Cluster-scoped task.
    ClusterTask,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRef {
    pub name: String,
    #[serde(default)]
    pub kind: TaskKind,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,
}

impl TaskRef {
    pub fn task<N: Into<String>>(name: N) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn cluster_task<N: Into<String>>(name: N) -> Self {
        Self {
            name: name.into(),
            kind: TaskKind::ClusterTask,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,
}

/// Binds a declared slot to a stored resource or an inline description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResourceBinding {
    /// Slot name as declared by the task.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_ref: Option<ResourceRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_spec: Option<PipelineResourceSpec>,
    /// Shared-volume locations used to hand data between pipeline tasks.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<String>,
}

impl TaskResourceBinding {
    pub fn by_ref<S, R>(slot: S, resource: R) -> Self
    where
        S: Into<String>,
        R: Into<String>,
    {
        Self {
            name: slot.into(),
            resource_ref: Some(ResourceRef {
                name: resource.into(),
                api_version: String::new(),
            }),
            ..Default::default()
        }
    }

    pub fn inline<S: Into<String>>(slot: S, spec: PipelineResourceSpec) -> Self {
        Self {
            name: slot.into(),
            resource_spec: Some(spec),
            ..Default::default()
        }
    }

    pub fn with_paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.paths = paths.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRunInputs {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<TaskResourceBinding>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Param>,
}

impl TaskRunInputs {
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty() && self.params.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRunOutputs {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<TaskResourceBinding>,
}

impl TaskRunOutputs {
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// Requested lifecycle override on a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskRunSpecStatus {
    #[serde(rename = "TaskRunCancelled")]
    Cancelled,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRunSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_ref: Option<TaskRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_spec: Option<TaskSpec>,
    #[serde(default, skip_serializing_if = "TaskRunInputs::is_empty")]
    pub inputs: TaskRunInputs,
    #[serde(default, skip_serializing_if = "TaskRunOutputs::is_empty")]
    pub outputs: TaskRunOutputs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<GoDuration>,
    #[serde(default)]
    pub retries: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskRunSpecStatus>,
}

/// Snapshot of one step container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepState {
    pub name: String,
    #[serde(flatten)]
    pub state: ContainerState,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRunStatus {
    #[serde(default, skip_serializing_if = "Conditions::is_empty")]
    pub conditions: Conditions,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pod_name: String,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub start_time: Option<OffsetDateTime>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub completion_time: Option<OffsetDateTime>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<StepState>,
    /// Archived failed attempts, oldest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub retries_status: Vec<TaskRunStatus>,
}

impl TaskRunStatus {
    pub fn condition(&self) -> Option<&Condition> {
        self.conditions.succeeded()
    }
}

/// A single request to run the steps of a task inside one pod.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRun {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: TaskRunSpec,
    #[serde(default)]
    pub status: TaskRunStatus,
}

impl TaskRun {
    pub fn new<N, M>(namespace: N, name: M) -> Self
    where
        N: Into<String>,
        M: Into<String>,
    {
        Self {
            metadata: ObjectMeta::new(namespace, name),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn namespace(&self) -> &str {
        &self.metadata.namespace
    }

    pub fn key(&self) -> String {
        self.metadata.key()
    }

    pub fn condition(&self) -> Option<&Condition> {
        self.status.condition()
    }

    /// Whether the `Succeeded` condition has reached True or False.
    pub fn is_done(&self) -> bool {
        self.condition().is_some_and(|c| !c.is_unknown())
    }

    pub fn is_cancelled(&self) -> bool {
        self.spec.status == Some(TaskRunSpecStatus::Cancelled)
    }
}
