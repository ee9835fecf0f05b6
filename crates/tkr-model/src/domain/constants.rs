/// API version stamped on owner references pointing back at a TaskRun.
pub const API_VERSION: &str = "tekton.dev/v1alpha1";

/// Object kind of a run.
pub const KIND_TASK_RUN: &str = "TaskRun";

/// Object kind of the pipeline-level orchestrator owning child runs.
pub const KIND_PIPELINE_RUN: &str = "PipelineRun";

/// Pod label carrying the name of the resolved Task (omitted for inline specs).
pub const LABEL_TASK: &str = "tekton.dev/task";

/// Pod label carrying the name of the originating TaskRun.
pub const LABEL_TASK_RUN: &str = "tekton.dev/taskRun";

/// Annotation used to keep service-mesh sidecars out of execution pods.
pub const ANNOTATION_SIDECAR_INJECT: &str = "sidecar.istio.io/inject";
