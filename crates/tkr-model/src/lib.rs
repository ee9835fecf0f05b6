mod domain;
pub use domain::{
    ANNOTATION_SIDECAR_INJECT, API_VERSION, KIND_PIPELINE_RUN, KIND_TASK_RUN, LABEL_TASK,
    LABEL_TASK_RUN,
};
pub use domain::{Env, EnvVar, GoDuration, Labels};

mod error;
pub use error::{ModelError, ModelResult};

mod meta;
pub use meta::{ObjectMeta, OwnerReference};

mod condition;
pub use condition::{CONDITION_SUCCEEDED, Condition, ConditionStatus, Conditions};

mod pod;
pub use pod::{
    ConfigMapVolumeSource, Container, ContainerState, ContainerStateRunning,
    ContainerStateTerminated, ContainerStateWaiting, ContainerStatus, EmptyDirVolumeSource,
    PersistentVolumeClaimVolumeSource, Pod, PodCondition, PodPhase, PodSpec, PodStatus,
    RestartPolicy, SecretVolumeSource, Volume, VolumeMount,
};

mod resource;
pub use resource::{Param, PipelineResource, PipelineResourceSpec, ResourceType};

mod task;
pub use task::{ClusterTask, Inputs, Outputs, ParamSpec, Task, TaskResource, TaskSpec};

mod taskrun;
pub use taskrun::{
    ResourceRef, StepState, TaskKind, TaskRef, TaskResourceBinding, TaskRun, TaskRunInputs,
    TaskRunOutputs, TaskRunSpec, TaskRunSpecStatus, TaskRunStatus,
};

mod pipelinerun;
pub use pipelinerun::{PipelineRef, PipelineRun, PipelineRunSpec, PipelineRunStatus};

mod account;
pub use account::{ObjectReference, Secret, ServiceAccount};
