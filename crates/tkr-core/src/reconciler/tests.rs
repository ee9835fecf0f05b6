use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use rstest::rstest;
use time::{OffsetDateTime, macros::datetime};
use tkr_model::{
    Condition, ConditionStatus, Container, ContainerState, ContainerStatus, GoDuration, ObjectMeta,
    PodPhase, PodStatus, Task, TaskRef, TaskRun, TaskRunSpecStatus, TaskSpec,
};

use super::*;
use crate::{
    cluster::{InMemoryCluster, Op},
    config::ControllerConfig,
    error::ClientError,
    metrics::MetricsBackend,
    ports::{FixedClock, SequenceNames},
    status::{REASON_CANCELLED, REASON_FAILED_RESOLUTION, REASON_PENDING, REASON_TIMEOUT},
};

const T0: OffsetDateTime = datetime!(2024-03-01 10:00 UTC);

#[derive(Default)]
struct RecordingMetrics {
    events: Mutex<Vec<String>>,
}

impl RecordingMetrics {
    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl MetricsBackend for RecordingMetrics {
    fn record_pod_created(&self) {
        self.push("pod_created".into());
    }

    fn record_run_completed(&self, outcome: RunOutcome, _: u64) {
        self.push(format!("completed:{}", outcome.as_label()));
    }

    fn record_retry(&self) {
        self.push("retry".into());
    }

    fn record_reconcile_error(&self, error_kind: &str) {
        self.push(format!("error:{error_kind}"));
    }
}

struct Harness {
    cluster: Arc<InMemoryCluster>,
    clock: Arc<FixedClock>,
    metrics: Arc<RecordingMetrics>,
    reconciler: TaskRunReconciler,
}

impl Harness {
    fn new(cluster: InMemoryCluster) -> Self {
        let cluster = Arc::new(cluster);
        let clock = Arc::new(FixedClock::new(T0));
        let metrics = Arc::new(RecordingMetrics::default());
        let ctx = ReconcilerContext::new(ControllerConfig::default())
            .with_clock(clock.clone())
            .with_names(Arc::new(SequenceNames::new()))
            .with_metrics(metrics.clone());
        let reconciler = TaskRunReconciler::new(cluster.clone(), ctx);
        Self {
            cluster,
            clock,
            metrics,
            reconciler,
        }
    }

    async fn reconcile(&self, name: &str) -> Result<(), ReconcileError> {
        self.reconciler.reconcile(&format!("foo/{name}")).await
    }

    async fn run(&self, name: &str) -> TaskRun {
        self.cluster.task_run("foo", name).await.unwrap()
    }

    async fn ops(&self) -> Vec<Op> {
        self.cluster.actions().await.into_iter().map(|a| a.op).collect()
    }

    async fn set_phase(&self, name: &str, status: PodStatus) {
        let pod = self.run(name).await.status.pod_name;
        self.cluster.set_pod_status("foo", &pod, status).await.unwrap();
    }
}

fn task() -> Task {
    Task {
        metadata: ObjectMeta::new("foo", "test-task"),
        spec: TaskSpec::default()
            .with_step(Container::new("simple-step", "foo").with_command(["/mycmd"])),
    }
}

fn run(name: &str) -> TaskRun {
    let mut run = TaskRun::new("foo", name);
    run.spec.task_ref = Some(TaskRef::task("test-task"));
    run
}

fn phase(phase: PodPhase) -> PodStatus {
    PodStatus {
        phase: Some(phase),
        ..Default::default()
    }
}

fn failed_step() -> PodStatus {
    PodStatus {
        phase: Some(PodPhase::Failed),
        container_statuses: vec![ContainerStatus {
            name: "build-step-simple-step".into(),
            image_id: "sha256:abc".into(),
            state: ContainerState::terminated(1),
            ..Default::default()
        }],
        ..Default::default()
    }
}

#[rstest]
#[case("foo")]
#[case("foo/bar/baz")]
#[case("")]
#[tokio::test]
async fn invalid_keys_are_ignored(#[case] key: &str) {
    let h = Harness::new(InMemoryCluster::new());
    h.reconciler.reconcile(key).await.unwrap();
    assert!(h.ops().await.is_empty());
}

#[tokio::test]
async fn missing_run_is_ignored() {
    let h = Harness::new(InMemoryCluster::new());
    h.reconcile("gone").await.unwrap();
    assert_eq!(h.ops().await, [Op::GetTaskRun]);
    assert!(h.metrics.events().is_empty());
}

#[tokio::test]
async fn first_pass_creates_pod_and_marks_running() {
    let h = Harness::new(
        InMemoryCluster::new()
            .with_task(task())
            .with_task_run(run("test-taskrun-run-success")),
    );

    h.reconcile("test-taskrun-run-success").await.unwrap();

    let stored = h.run("test-taskrun-run-success").await;
    assert_eq!(stored.status.pod_name, "test-taskrun-run-success-pod-bbbbc");
    assert_eq!(stored.status.start_time, Some(T0));
    let cond = stored.condition().unwrap();
    assert!(cond.is_unknown());
    assert_eq!((cond.reason.as_str(), cond.message.as_str()), ("Running", "Running"));

    let pod = h
        .cluster
        .pod("foo", "test-taskrun-run-success-pod-bbbbc")
        .await
        .unwrap();
    assert_eq!(pod.spec.containers.len(), 2);
    assert_eq!(h.metrics.events(), ["pod_created"]);
}

#[tokio::test]
async fn existing_pod_is_not_recreated() {
    let h = Harness::new(InMemoryCluster::new().with_task(task()).with_task_run(run("r")));

    h.reconcile("r").await.unwrap();
    h.set_phase("r", phase(PodPhase::Running)).await;
    h.reconcile("r").await.unwrap();

    let creates = h.ops().await.into_iter().filter(|op| *op == Op::CreatePod).count();
    assert_eq!(creates, 1);
    let cond = h.run("r").await.condition().cloned().unwrap();
    assert_eq!(cond.reason, "Building");
}

#[tokio::test]
async fn succeeded_pod_completes_run() {
    let h = Harness::new(InMemoryCluster::new().with_task(task()).with_task_run(run("r")));

    h.reconcile("r").await.unwrap();
    h.clock.advance(Duration::from_secs(30));
    h.set_phase("r", phase(PodPhase::Succeeded)).await;
    h.reconcile("r").await.unwrap();

    let stored = h.run("r").await;
    assert_eq!(stored.condition().unwrap(), &{
        let mut c = Condition::bare(ConditionStatus::True);
        c.last_transition_time = Some(T0 + Duration::from_secs(30));
        c
    });
    assert_eq!(stored.status.completion_time, Some(T0 + Duration::from_secs(30)));
    assert_eq!(h.metrics.events(), ["pod_created", "completed:success"]);
}

#[tokio::test]
async fn finished_runs_are_left_alone() {
    let mut done = run("done");
    done.status
        .conditions
        .set(Condition::bare(ConditionStatus::True), T0);
    let h = Harness::new(InMemoryCluster::new().with_task(task()).with_task_run(done));

    h.reconcile("done").await.unwrap();
    assert_eq!(h.ops().await, [Op::GetTaskRun]);
}

#[tokio::test]
async fn missing_task_fails_resolution_without_pod() {
    let h = Harness::new(InMemoryCluster::new().with_task_run(run("r")));

    h.reconcile("r").await.unwrap();

    let stored = h.run("r").await;
    let cond = stored.condition().unwrap();
    assert!(cond.is_false());
    assert_eq!(cond.reason, REASON_FAILED_RESOLUTION);
    assert!(cond.message.contains("\"test-task\" not found"), "{}", cond.message);
    assert!(stored.status.completion_time.is_some());
    assert!(stored.status.pod_name.is_empty());

    let ops = h.ops().await;
    assert!(!ops.iter().any(|op| matches!(op, Op::CreatePod | Op::DeletePod | Op::GetPod)));
    assert_eq!(h.metrics.events(), ["completed:failure"]);
}

#[tokio::test]
async fn missing_params_fail_resolution() {
    let task = Task {
        metadata: ObjectMeta::new("foo", "test-task"),
        spec: task().spec.with_param(tkr_model::ParamSpec::required("myarg")),
    };
    let h = Harness::new(InMemoryCluster::new().with_task(task).with_task_run(run("r")));

    h.reconcile("r").await.unwrap();
    let cond = h.run("r").await.condition().cloned().unwrap();
    assert_eq!(cond.reason, REASON_FAILED_RESOLUTION);
    assert_eq!(
        cond.message,
        "missing values for these params which have no default values: [myarg]"
    );
}

#[tokio::test]
async fn cancelled_run_is_terminated_and_pod_deleted() {
    let h = Harness::new(InMemoryCluster::new().with_task(task()).with_task_run(run("r")));
    h.reconcile("r").await.unwrap();
    let pod = h.run("r").await.status.pod_name;

    let mut cancelled = h.run("r").await;
    cancelled.spec.status = Some(TaskRunSpecStatus::Cancelled);
    h.cluster.put_task_run(cancelled).await;
    h.reconcile("r").await.unwrap();

    let cond = h.run("r").await.condition().cloned().unwrap();
    assert!(cond.is_false());
    assert_eq!(cond.reason, REASON_CANCELLED);
    assert_eq!(cond.message, "TaskRun \"r\" was cancelled");
    assert!(h.cluster.pod("foo", &pod).await.is_none());
    assert_eq!(h.metrics.events(), ["pod_created", "completed:cancelled"]);
}

#[tokio::test]
async fn cancelled_run_without_pod_still_terminates() {
    let mut r = run("r");
    r.spec.status = Some(TaskRunSpecStatus::Cancelled);
    r.status
        .conditions
        .set(Condition::bare(ConditionStatus::Unknown), T0);
    let h = Harness::new(InMemoryCluster::new().with_task_run(r));

    h.reconcile("r").await.unwrap();
    let stored = h.run("r").await;
    assert_eq!(stored.condition().unwrap().reason, REASON_CANCELLED);
    assert!(!h.ops().await.contains(&Op::DeletePod));
}

#[tokio::test]
async fn timeout_with_one_retry_archives_then_fails() {
    let mut r = run("r");
    r.spec.timeout = Some(GoDuration::from_secs(10));
    r.spec.retries = 1;
    r.status.start_time = Some(T0 - Duration::from_secs(20));
    r.status
        .conditions
        .set(Condition::bare(ConditionStatus::Unknown), T0 - Duration::from_secs(20));
    let h = Harness::new(InMemoryCluster::new().with_task(task()).with_task_run(r));

    h.reconcile("r").await.unwrap();

    let stored = h.run("r").await;
    assert_eq!(stored.status.retries_status.len(), 1);
    let archived = stored.status.retries_status[0].condition().unwrap();
    assert!(archived.is_false());
    assert_eq!(archived.reason, REASON_TIMEOUT);
    let live = stored.condition().unwrap();
    assert!(live.is_unknown());
    assert!(live.reason.is_empty() && live.message.is_empty());
    assert_eq!(stored.status.start_time, Some(T0));
    assert!(stored.status.completion_time.is_none());

    h.clock.advance(Duration::from_secs(11));
    h.reconcile("r").await.unwrap();

    let stored = h.run("r").await;
    let cond = stored.condition().unwrap();
    assert!(cond.is_false());
    assert_eq!(cond.reason, REASON_TIMEOUT);
    assert_eq!(cond.message, "TaskRun \"r\" failed to finish within \"10s\"");
    assert_eq!(stored.status.retries_status.len(), 1);
    assert!(stored.status.completion_time.is_some());
    assert_eq!(h.metrics.events(), ["retry", "completed:timeout"]);
}

#[tokio::test]
async fn default_timeout_applies_and_deletes_pod() {
    let h = Harness::new(InMemoryCluster::new().with_task(task()).with_task_run(run("r")));
    h.reconcile("r").await.unwrap();
    let pod = h.run("r").await.status.pod_name;

    h.clock.advance(Duration::from_secs(61 * 60));
    h.reconcile("r").await.unwrap();

    let cond = h.run("r").await.condition().cloned().unwrap();
    assert_eq!(cond.message, "TaskRun \"r\" failed to finish within \"1h0m0s\"");
    assert!(h.cluster.pod("foo", &pod).await.is_none());
}

#[tokio::test]
async fn failed_pod_is_retried_with_a_fresh_pod() {
    let mut r = run("r");
    r.spec.retries = 1;
    let h = Harness::new(InMemoryCluster::new().with_task(task()).with_task_run(r));

    h.reconcile("r").await.unwrap();
    let first_pod = h.run("r").await.status.pod_name;
    h.set_phase("r", failed_step()).await;
    h.reconcile("r").await.unwrap();

    let stored = h.run("r").await;
    assert!(stored.status.pod_name.is_empty());
    assert!(stored.status.steps.is_empty());
    let archived = &stored.status.retries_status[0];
    assert_eq!(archived.pod_name, first_pod);
    assert_eq!(archived.steps.len(), 1);
    assert!(archived.condition().unwrap().message.starts_with(
        "build step \"build-step-simple-step\" exited with code 1 (image: \"sha256:abc\")"
    ));
    assert!(h.cluster.pod("foo", &first_pod).await.is_none());

    h.reconcile("r").await.unwrap();
    let second_pod = h.run("r").await.status.pod_name;
    assert!(!second_pod.is_empty());
    assert_ne!(second_pod, first_pod);

    h.set_phase("r", failed_step()).await;
    h.reconcile("r").await.unwrap();
    let stored = h.run("r").await;
    assert!(stored.condition().unwrap().is_false());
    assert_eq!(stored.status.retries_status.len(), 1);
    assert_eq!(stored.status.pod_name, second_pod);
}

#[tokio::test]
async fn pending_pod_without_messages_reports_pending() {
    let h = Harness::new(InMemoryCluster::new().with_task(task()).with_task_run(run("r")));
    h.reconcile("r").await.unwrap();
    h.set_phase("r", phase(PodPhase::Pending)).await;
    h.reconcile("r").await.unwrap();

    let cond = h.run("r").await.condition().cloned().unwrap();
    assert!(cond.is_unknown());
    assert_eq!(cond.reason, REASON_PENDING);
    assert_eq!(cond.message, "Pending");
}

#[tokio::test]
async fn vanished_pod_is_recreated() {
    let h = Harness::new(InMemoryCluster::new().with_task(task()).with_task_run(run("r")));
    h.reconcile("r").await.unwrap();
    let first = h.run("r").await.status.pod_name;
    h.cluster.delete_pod("foo", &first).await.unwrap();

    h.reconcile("r").await.unwrap();
    let second = h.run("r").await.status.pod_name;
    assert_ne!(first, second);
    assert!(h.cluster.pod("foo", &second).await.is_some());
}

#[tokio::test]
async fn transient_pod_lookup_leaves_status_untouched() {
    let mut r = run("r");
    r.status.pod_name = "r-pod-xxxxx".into();
    let h = Harness::new(InMemoryCluster::new().with_task(task()).with_task_run(r.clone()));
    h.cluster
        .inject_failure(Op::GetPod, ClientError::Unavailable("apiserver down".into()))
        .await;

    let err = h.reconcile("r").await.unwrap_err();
    assert!(matches!(err, ReconcileError::Client(ClientError::Unavailable(_))));

    assert_eq!(h.run("r").await.status, r.status);
    assert!(!h.ops().await.contains(&Op::UpdateTaskRunStatus));
    assert_eq!(h.metrics.events(), ["error:unavailable"]);
}

#[tokio::test]
async fn transient_task_lookup_leaves_status_untouched() {
    let h = Harness::new(InMemoryCluster::new().with_task(task()).with_task_run(run("r")));
    h.cluster
        .inject_failure(Op::GetTask, ClientError::Unavailable("apiserver down".into()))
        .await;

    let err = h.reconcile("r").await.unwrap_err();
    assert_eq!(err.kind(), "unavailable");

    let stored = h.run("r").await;
    assert!(stored.status.start_time.is_none());
    assert!(stored.condition().is_none());
    assert_eq!(h.ops().await, [Op::GetTaskRun, Op::GetTask]);

    h.cluster.clear_failure(Op::GetTask).await;
    h.reconcile("r").await.unwrap();
    assert_eq!(h.run("r").await.status.start_time, Some(T0));
}

#[tokio::test]
async fn status_update_failure_is_returned() {
    let h = Harness::new(InMemoryCluster::new().with_task(task()).with_task_run(run("r")));
    h.cluster
        .inject_failure(Op::UpdateTaskRunStatus, ClientError::Conflict("stale".into()))
        .await;

    let err = h.reconcile("r").await.unwrap_err();
    assert_eq!(err.kind(), "conflict");
}

#[tokio::test]
async fn pod_created_before_failed_status_write_is_adopted() {
    let h = Harness::new(InMemoryCluster::new().with_task(task()).with_task_run(run("r")));
    h.cluster
        .inject_failure(Op::UpdateTaskRunStatus, ClientError::Conflict("stale".into()))
        .await;
    assert!(h.reconcile("r").await.is_err());
    assert!(h.run("r").await.status.pod_name.is_empty());

    h.cluster.clear_failure(Op::UpdateTaskRunStatus).await;
    h.reconcile("r").await.unwrap();

    let pods = h.cluster.pods().await;
    assert_eq!(pods.len(), 1);
    assert_eq!(h.run("r").await.status.pod_name, pods[0].metadata.name);
    let creates = h.ops().await.into_iter().filter(|op| *op == Op::CreatePod).count();
    assert_eq!(creates, 1);
    assert_eq!(h.metrics.events(), ["pod_created", "error:conflict"]);
}

#[tokio::test]
async fn pod_of_archived_attempt_is_not_adopted() {
    let mut r = run("r");
    r.spec.retries = 1;
    let h = Harness::new(InMemoryCluster::new().with_task(task()).with_task_run(r));

    h.reconcile("r").await.unwrap();
    let first_pod = h.run("r").await.status.pod_name;
    h.set_phase("r", failed_step()).await;
    h.cluster
        .inject_failure(Op::DeletePod, ClientError::Unavailable("apiserver down".into()))
        .await;
    h.reconcile("r").await.unwrap();
    assert!(h.cluster.pod("foo", &first_pod).await.is_some());

    h.cluster.clear_failure(Op::DeletePod).await;
    h.reconcile("r").await.unwrap();

    let second_pod = h.run("r").await.status.pod_name;
    assert!(!second_pod.is_empty());
    assert_ne!(second_pod, first_pod);
    assert_eq!(h.cluster.pods().await.len(), 2);
}

#[tokio::test]
async fn unknown_entrypoint_is_a_build_error() {
    let task = Task {
        metadata: ObjectMeta::new("foo", "test-task"),
        spec: TaskSpec::default().with_step(Container::new("compile", "gcc")),
    };
    let h = Harness::new(InMemoryCluster::new().with_task(task).with_task_run(run("r")));

    let err = h.reconcile("r").await.unwrap_err();
    assert_eq!(err.kind(), "build");
    let ops = h.ops().await;
    assert!(!ops.contains(&Op::CreatePod));
    assert!(!ops.contains(&Op::UpdateTaskRunStatus));
    assert!(h.run("r").await.status.start_time.is_none());
}

#[tokio::test]
async fn malformed_volume_fails_resolution() {
    let task = Task {
        metadata: ObjectMeta::new("foo", "test-task"),
        spec: task()
            .spec
            .with_volume(tkr_model::Volume::config_map("cfg", "${inputs.params.missing}")),
    };
    let h = Harness::new(InMemoryCluster::new().with_task(task).with_task_run(run("r")));

    h.reconcile("r").await.unwrap();
    let cond = h.run("r").await.condition().cloned().unwrap();
    assert_eq!(cond.reason, REASON_FAILED_RESOLUTION);
    assert!(!h.ops().await.contains(&Op::CreatePod));
}
