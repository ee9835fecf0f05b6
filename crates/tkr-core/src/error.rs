use thiserror::Error;
use tkr_model::ResourceType;

/// Failure reported by a [`ClusterClient`](crate::ports::ClusterClient) call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("{kind} {name:?} not found")]
    NotFound { kind: &'static str, name: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("cluster unavailable: {0}")]
    Unavailable(String),
}

impl ClientError {
    pub fn not_found<N: Into<String>>(kind: &'static str, name: N) -> Self {
        ClientError::NotFound {
            kind,
            name: name.into(),
        }
    }

    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound { .. })
    }
}

/// Failure while turning a run into a resolved task.
///
/// Everything except [`ResolveError::Lookup`] is terminal: the run is marked
/// `FailedResolution` and no pod is ever created for it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("taskRun {run} has neither a taskRef nor a taskSpec")]
    NoTask { run: String },

    #[error("error when listing tasks for taskRun {run}: {kind} {name:?} not found")]
    TaskNotFound {
        run: String,
        kind: &'static str,
        name: String,
    },

    #[error("task declares resource {slot:?} but the taskRun does not bind it")]
    UnboundSlot { slot: String },

    #[error("taskRun binds resource {slot:?} which the task does not declare")]
    UnknownSlot { slot: String },

    #[error("binding {slot:?} has neither a resourceRef nor a resourceSpec")]
    EmptyBinding { slot: String },

    #[error("failed to get resource {name:?} bound to {slot:?}: not found")]
    ResourceNotFound { slot: String, name: String },

    #[error("resource {slot:?} has type {actual} but the task expects {expected}")]
    TypeMismatch {
        slot: String,
        expected: ResourceType,
        actual: ResourceType,
    },

    #[error("no handler registered for resource type {0}")]
    UnsupportedType(ResourceType),

    #[error("missing values for these params which have no default values: [{}]", .0.join(" "))]
    MissingParams(Vec<String>),

    #[error("didn't need these params but they were provided anyway: [{}]", .0.join(" "))]
    ExtraParams(Vec<String>),

    #[error("volume {volume:?} has malformed templated source name {value:?}")]
    MalformedVolume { volume: String, value: String },

    #[error("{0}")]
    Lookup(#[from] ClientError),
}

impl ResolveError {
    /// `true` unless the failure came from a transient cluster lookup.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ResolveError::Lookup(_))
    }
}

/// Failure reported by an [`ImageInspector`](crate::ports::ImageInspector).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("image inspection failed: {0}")]
pub struct InspectError(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("entrypoint of image {image:?} is not cached and no inspector is configured")]
    EntrypointUnknown { image: String },

    #[error("failed to resolve entrypoint of image {image:?}: {source}")]
    Inspect {
        image: String,
        #[source]
        source: InspectError,
    },

    #[error("image {image:?} has an empty entrypoint")]
    EmptyEntrypoint { image: String },

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// Transient reconcile failure; the trigger is expected to retry the key.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("cluster call failed: {0}")]
    Client(#[from] ClientError),

    #[error("pod build failed: {0}")]
    Build(#[from] BuildError),
}

impl ReconcileError {
    /// Low-cardinality label for error metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ReconcileError::Client(ClientError::NotFound { .. }) => "not_found",
            ReconcileError::Client(ClientError::Conflict(_)) => "conflict",
            ReconcileError::Client(ClientError::Unavailable(_)) => "unavailable",
            ReconcileError::Build(BuildError::Client(_)) => "build_client",
            ReconcileError::Build(_) => "build",
        }
    }
}

/// Aggregated failure of cancelling the child runs of a pipeline run.
///
/// Child updates that succeeded are not rolled back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Error cancelled PipelineRun's TaskRun(s): {}", .errors.join("\n"))]
pub struct CancelError {
    pub errors: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid controller config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("controller config io: {0}")]
    Io(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e.to_string())
    }
}
