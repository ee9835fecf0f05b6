use async_trait::async_trait;
use tkr_model::{
    ClusterTask, Labels, PipelineResource, Pod, Secret, ServiceAccount, Task, TaskRun,
};

use crate::error::ClientError;

/// Typed access to the cluster objects the reconciler reads and writes.
///
/// Only [`ClientError::NotFound`] carries meaning for callers; every other error is
/// treated as transient.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    async fn get_task_run(&self, namespace: &str, name: &str) -> Result<TaskRun, ClientError>;

    /// Persist metadata and spec. The stored status is left as is.
    async fn update_task_run(&self, run: &TaskRun) -> Result<TaskRun, ClientError>;

    /// Persist status only. The stored spec is left as is.
    async fn update_task_run_status(&self, run: &TaskRun) -> Result<TaskRun, ClientError>;

    async fn get_task(&self, namespace: &str, name: &str) -> Result<Task, ClientError>;

    async fn get_cluster_task(&self, name: &str) -> Result<ClusterTask, ClientError>;

    async fn get_pipeline_resource(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<PipelineResource, ClientError>;

    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod, ClientError>;

    /// Pods in `namespace` carrying every label in `selector`.
    async fn list_pods(&self, namespace: &str, selector: &Labels) -> Result<Vec<Pod>, ClientError>;

    async fn create_pod(&self, pod: &Pod) -> Result<Pod, ClientError>;

    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<(), ClientError>;

    async fn get_service_account(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<ServiceAccount, ClientError>;

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, ClientError>;
}
