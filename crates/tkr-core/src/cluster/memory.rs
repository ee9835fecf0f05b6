use std::collections::{BTreeMap, HashMap, VecDeque};

use async_trait::async_trait;
use time::OffsetDateTime;
use tkr_model::{
    ClusterTask, Labels, PipelineResource, Pod, PodStatus, Secret, ServiceAccount, Task, TaskRun,
};
use tokio::sync::RwLock;
use tracing::trace;
use uuid::Uuid;

use crate::{cluster::Fixtures, error::ClientError, ports::ClusterClient};

/// Client operation, used to address injected failures and to read the action log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    GetTaskRun,
    UpdateTaskRun,
    UpdateTaskRunStatus,
    GetTask,
    GetClusterTask,
    GetPipelineResource,
    GetPod,
    ListPods,
    CreatePod,
    DeletePod,
    GetServiceAccount,
    GetSecret,
}

impl Op {
    /// Whether the operation writes to the cluster.
    pub fn is_mutation(self) -> bool {
        matches!(
            self,
            Op::UpdateTaskRun | Op::UpdateTaskRunStatus | Op::CreatePod | Op::DeletePod
        )
    }
}

/// One logged client call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub op: Op,
    /// `namespace/name`, or bare name for cluster-scoped objects.
    pub key: String,
}

/// Default number of calls kept in the action log.
pub const DEFAULT_ACTION_LOG_CAPACITY: usize = 1024;

#[derive(Debug)]
struct State {
    task_runs: BTreeMap<String, TaskRun>,
    tasks: BTreeMap<String, Task>,
    cluster_tasks: BTreeMap<String, ClusterTask>,
    resources: BTreeMap<String, PipelineResource>,
    pods: BTreeMap<String, Pod>,
    service_accounts: BTreeMap<String, ServiceAccount>,
    secrets: BTreeMap<String, Secret>,

    failures: HashMap<Op, ClientError>,
    actions: VecDeque<Action>,
    action_capacity: usize,
}

impl Default for State {
    fn default() -> Self {
        Self {
            task_runs: BTreeMap::new(),
            tasks: BTreeMap::new(),
            cluster_tasks: BTreeMap::new(),
            resources: BTreeMap::new(),
            pods: BTreeMap::new(),
            service_accounts: BTreeMap::new(),
            secrets: BTreeMap::new(),
            failures: HashMap::new(),
            actions: VecDeque::new(),
            action_capacity: DEFAULT_ACTION_LOG_CAPACITY,
        }
    }
}

impl State {
    /// Log the call and return the failure injected for `op`, if any.
    ///
    /// The log keeps the most recent `action_capacity` calls.
    fn enter(&mut self, op: Op, key: &str) -> Result<(), ClientError> {
        trace!(?op, key, "cluster call");
        if self.action_capacity > 0 {
            if self.actions.len() == self.action_capacity {
                self.actions.pop_front();
            }
            self.actions.push_back(Action {
                op,
                key: key.to_string(),
            });
        }
        match self.failures.get(&op) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

fn key(namespace: &str, name: &str) -> String {
    format!("{namespace}/{name}")
}

fn lookup<T: Clone>(
    map: &BTreeMap<String, T>,
    kind: &'static str,
    key: &str,
    name: &str,
) -> Result<T, ClientError> {
    map.get(key)
        .cloned()
        .ok_or_else(|| ClientError::not_found(kind, name))
}

/// Shared, thread-safe in-memory cluster.
#[derive(Debug, Default)]
pub struct InMemoryCluster {
    state: RwLock<State>,
}

impl InMemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixtures(fixtures: Fixtures) -> Self {
        Self::new().with_fixtures(fixtures)
    }

    pub fn with_fixtures(mut self, fixtures: Fixtures) -> Self {
        let Fixtures {
            task_runs,
            tasks,
            cluster_tasks,
            pipeline_resources,
            pods,
            service_accounts,
            secrets,
        } = fixtures;

        let state = self.state.get_mut();
        state.task_runs.extend(task_runs.into_iter().map(|o| (o.metadata.key(), o)));
        state.tasks.extend(tasks.into_iter().map(|o| (o.metadata.key(), o)));
        state
            .cluster_tasks
            .extend(cluster_tasks.into_iter().map(|o| (o.metadata.name.clone(), o)));
        state
            .resources
            .extend(pipeline_resources.into_iter().map(|o| (o.metadata.key(), o)));
        state.pods.extend(pods.into_iter().map(|o| (o.metadata.key(), o)));
        state
            .service_accounts
            .extend(service_accounts.into_iter().map(|o| (o.metadata.key(), o)));
        state.secrets.extend(secrets.into_iter().map(|o| (o.metadata.key(), o)));
        self
    }

    /// Keep at most `capacity` calls in the action log; zero turns logging off.
    pub fn with_action_log_capacity(mut self, capacity: usize) -> Self {
        let state = self.state.get_mut();
        state.action_capacity = capacity;
        state.actions.truncate(capacity);
        self
    }

    pub fn with_task_run(mut self, run: TaskRun) -> Self {
        self.state.get_mut().task_runs.insert(run.metadata.key(), run);
        self
    }

    pub fn with_task(mut self, task: Task) -> Self {
        self.state.get_mut().tasks.insert(task.metadata.key(), task);
        self
    }

    pub fn with_cluster_task(mut self, task: ClusterTask) -> Self {
        self.state
            .get_mut()
            .cluster_tasks
            .insert(task.metadata.name.clone(), task);
        self
    }

    pub fn with_pipeline_resource(mut self, res: PipelineResource) -> Self {
        self.state.get_mut().resources.insert(res.metadata.key(), res);
        self
    }

    pub fn with_pod(mut self, pod: Pod) -> Self {
        self.state.get_mut().pods.insert(pod.metadata.key(), pod);
        self
    }

    pub fn with_service_account(mut self, sa: ServiceAccount) -> Self {
        self.state.get_mut().service_accounts.insert(sa.metadata.key(), sa);
        self
    }

    pub fn with_secret(mut self, secret: Secret) -> Self {
        self.state.get_mut().secrets.insert(secret.metadata.key(), secret);
        self
    }

    /// Make every later call of `op` fail with `err` until cleared.
    pub async fn inject_failure(&self, op: Op, err: ClientError) {
        self.state.write().await.failures.insert(op, err);
    }

    pub async fn clear_failure(&self, op: Op) {
        self.state.write().await.failures.remove(&op);
    }

    /// Insert or replace a run, bypassing the action log.
    pub async fn put_task_run(&self, run: TaskRun) {
        self.state.write().await.task_runs.insert(run.metadata.key(), run);
    }

    /// Overwrite the observed status of a pod, as the node agent would.
    pub async fn set_pod_status(
        &self,
        namespace: &str,
        name: &str,
        status: PodStatus,
    ) -> Result<(), ClientError> {
        let mut state = self.state.write().await;
        let pod = state
            .pods
            .get_mut(&key(namespace, name))
            .ok_or_else(|| ClientError::not_found("Pod", name))?;
        pod.status = status;
        Ok(())
    }

    pub async fn task_run_keys(&self) -> Vec<String> {
        self.state.read().await.task_runs.keys().cloned().collect()
    }

    pub async fn task_run(&self, namespace: &str, name: &str) -> Option<TaskRun> {
        self.state.read().await.task_runs.get(&key(namespace, name)).cloned()
    }

    pub async fn pod(&self, namespace: &str, name: &str) -> Option<Pod> {
        self.state.read().await.pods.get(&key(namespace, name)).cloned()
    }

    pub async fn pods(&self) -> Vec<Pod> {
        self.state.read().await.pods.values().cloned().collect()
    }

    /// Logged calls, oldest first.
    pub async fn actions(&self) -> Vec<Action> {
        self.state.read().await.actions.iter().cloned().collect()
    }

    pub async fn clear_actions(&self) {
        self.state.write().await.actions.clear();
    }
}

#[async_trait]
impl ClusterClient for InMemoryCluster {
    async fn get_task_run(&self, namespace: &str, name: &str) -> Result<TaskRun, ClientError> {
        let k = key(namespace, name);
        let mut state = self.state.write().await;
        state.enter(Op::GetTaskRun, &k)?;
        lookup(&state.task_runs, "TaskRun", &k, name)
    }

    async fn update_task_run(&self, run: &TaskRun) -> Result<TaskRun, ClientError> {
        let k = run.metadata.key();
        let mut state = self.state.write().await;
        state.enter(Op::UpdateTaskRun, &k)?;
        let stored = state
            .task_runs
            .get_mut(&k)
            .ok_or_else(|| ClientError::not_found("TaskRun", run.name()))?;
        stored.metadata = run.metadata.clone();
        stored.spec = run.spec.clone();
        Ok(stored.clone())
    }

    async fn update_task_run_status(&self, run: &TaskRun) -> Result<TaskRun, ClientError> {
        let k = run.metadata.key();
        let mut state = self.state.write().await;
        state.enter(Op::UpdateTaskRunStatus, &k)?;
        let stored = state
            .task_runs
            .get_mut(&k)
            .ok_or_else(|| ClientError::not_found("TaskRun", run.name()))?;
        stored.status = run.status.clone();
        Ok(stored.clone())
    }

    async fn get_task(&self, namespace: &str, name: &str) -> Result<Task, ClientError> {
        let k = key(namespace, name);
        let mut state = self.state.write().await;
        state.enter(Op::GetTask, &k)?;
        lookup(&state.tasks, "Task", &k, name)
    }

    async fn get_cluster_task(&self, name: &str) -> Result<ClusterTask, ClientError> {
        let mut state = self.state.write().await;
        state.enter(Op::GetClusterTask, name)?;
        lookup(&state.cluster_tasks, "ClusterTask", name, name)
    }

    async fn get_pipeline_resource(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<PipelineResource, ClientError> {
        let k = key(namespace, name);
        let mut state = self.state.write().await;
        state.enter(Op::GetPipelineResource, &k)?;
        lookup(&state.resources, "PipelineResource", &k, name)
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod, ClientError> {
        let k = key(namespace, name);
        let mut state = self.state.write().await;
        state.enter(Op::GetPod, &k)?;
        lookup(&state.pods, "Pod", &k, name)
    }

    async fn list_pods(&self, namespace: &str, selector: &Labels) -> Result<Vec<Pod>, ClientError> {
        let mut state = self.state.write().await;
        state.enter(Op::ListPods, namespace)?;
        Ok(state
            .pods
            .values()
            .filter(|pod| pod.metadata.namespace == namespace)
            .filter(|pod| {
                selector
                    .iter()
                    .all(|(k, v)| pod.metadata.labels.get(k) == Some(v))
            })
            .cloned()
            .collect())
    }

    async fn create_pod(&self, pod: &Pod) -> Result<Pod, ClientError> {
        let k = pod.metadata.key();
        let mut state = self.state.write().await;
        state.enter(Op::CreatePod, &k)?;
        if state.pods.contains_key(&k) {
            return Err(ClientError::Conflict(format!("pod {k} already exists")));
        }

        let mut created = pod.clone();
        if created.metadata.uid.is_empty() {
            created.metadata.uid = Uuid::new_v4().to_string();
        }
        created
            .metadata
            .creation_timestamp
            .get_or_insert_with(OffsetDateTime::now_utc);
        state.pods.insert(k, created.clone());
        Ok(created)
    }

    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<(), ClientError> {
        let k = key(namespace, name);
        let mut state = self.state.write().await;
        state.enter(Op::DeletePod, &k)?;
        state
            .pods
            .remove(&k)
            .map(|_| ())
            .ok_or_else(|| ClientError::not_found("Pod", name))
    }

    async fn get_service_account(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<ServiceAccount, ClientError> {
        let k = key(namespace, name);
        let mut state = self.state.write().await;
        state.enter(Op::GetServiceAccount, &k)?;
        lookup(&state.service_accounts, "ServiceAccount", &k, name)
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, ClientError> {
        let k = key(namespace, name);
        let mut state = self.state.write().await;
        state.enter(Op::GetSecret, &k)?;
        lookup(&state.secrets, "Secret", &k, name)
    }
}
