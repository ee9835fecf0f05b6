pub mod cluster;
pub mod config;
pub mod entrypoint;
pub mod error;
pub mod metrics;
pub mod pipelinerun;
pub mod pod;
pub mod ports;
pub mod reconciler;
pub mod resolve;
pub mod resource;
pub mod status;
pub mod template;

pub mod prelude {
    pub use crate::cluster::InMemoryCluster;
    pub use crate::config::{ControllerConfig, ImagesConfig};
    pub use crate::entrypoint::EntrypointCache;
    pub use crate::error::{BuildError, CancelError, ClientError, ReconcileError, ResolveError};
    pub use crate::metrics::{MetricsBackend, MetricsHandle, RunOutcome};
    pub use crate::pipelinerun::{ChildTaskRun, cancel_pipeline_run};
    pub use crate::ports::{Clock, ClusterClient, ImageInspector, NameGenerator};
    pub use crate::reconciler::{ReconcilerContext, TaskRunReconciler};
    pub use crate::resource::{ResourceHandler, ResourceRegistry};
}
