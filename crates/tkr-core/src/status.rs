//! Projection of an observed pod onto a run's condition and step states.
use tkr_model::{
    Condition, ConditionStatus, ContainerStatus, Pod, PodCondition, PodPhase, StepState,
};

pub const REASON_RUNNING: &str = "Running";
pub const REASON_BUILDING: &str = "Building";
pub const REASON_PENDING: &str = "Pending";
pub const REASON_FAILED_RESOLUTION: &str = "FailedResolution";
pub const REASON_TIMEOUT: &str = "TaskRunTimeout";
pub const REASON_CANCELLED: &str = "TaskRunCancelled";
pub const REASON_PIPELINE_RUN_CANCELLED: &str = "PipelineRunCancelled";

const UNSPECIFIED_FAILURE: &str = "build failed for unspecified reasons.";

/// What a pod says about its run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    pub condition: Condition,
    /// One entry per non-init container, in pod order.
    pub steps: Vec<StepState>,
}

/// Condition of a run that has started but has nothing observed yet.
pub fn running() -> Condition {
    Condition::succeeded(ConditionStatus::Unknown, REASON_RUNNING, REASON_RUNNING)
}

/// Project `pod` onto a condition and step list. Pure.
pub fn project(pod: &Pod) -> Projection {
    let status = &pod.status;
    let condition = match status.phase {
        None | Some(PodPhase::Unknown) => running(),
        Some(PodPhase::Succeeded) => Condition::bare(ConditionStatus::True),
        Some(PodPhase::Running) => {
            Condition::succeeded(ConditionStatus::Unknown, REASON_BUILDING, "")
        }
        Some(PodPhase::Failed) => {
            Condition::succeeded(ConditionStatus::False, "", failure_message(pod))
        }
        Some(PodPhase::Pending) => {
            Condition::succeeded(ConditionStatus::Unknown, REASON_PENDING, pending_message(pod))
        }
    };

    let steps = status
        .container_statuses
        .iter()
        .map(|c| StepState {
            name: c.name.clone(),
            state: c.state.clone(),
        })
        .collect();

    Projection { condition, steps }
}

fn failure_message(pod: &Pod) -> String {
    let failed = pod.status.container_statuses.iter().find_map(|c| {
        c.state
            .terminated
            .as_ref()
            .filter(|t| t.exit_code != 0)
            .map(|t| (c, t.exit_code))
    });

    if let Some((c, code)) = failed {
        return format!(
            "build step {:?} exited with code {code} (image: {:?}); for logs run: kubectl -n {} logs {} -c {}",
            c.name, c.image_id, pod.metadata.namespace, pod.metadata.name, c.name
        );
    }
    if !pod.status.message.is_empty() {
        return pod.status.message.clone();
    }
    UNSPECIFIED_FAILURE.to_string()
}

fn pending_message(pod: &Pod) -> String {
    if let Some((c, msg)) = pod.status.container_statuses.iter().find_map(waiting_message) {
        return format!("build step {:?} is pending with reason {msg:?}", c.name);
    }
    if let Some(cond) = pod.status.conditions.iter().find(|c| !c.message.is_empty()) {
        return condition_message(cond);
    }
    if !pod.status.message.is_empty() {
        return pod.status.message.clone();
    }
    REASON_PENDING.to_string()
}

fn waiting_message(c: &ContainerStatus) -> Option<(&ContainerStatus, &str)> {
    c.state
        .waiting
        .as_ref()
        .filter(|w| !w.message.is_empty())
        .map(|w| (c, w.message.as_str()))
}

fn condition_message(cond: &PodCondition) -> String {
    format!(
        "pod status {:?}:{:?}; message: {:?}",
        cond.type_,
        cond.status.to_string(),
        cond.message
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tkr_model::{ContainerState, ObjectMeta, PodStatus};

    fn pod(status: PodStatus) -> Pod {
        Pod {
            metadata: ObjectMeta::new("foo", "test-taskrun-pod"),
            status,
            ..Default::default()
        }
    }

    fn step(name: &str, state: ContainerState) -> ContainerStatus {
        ContainerStatus {
            name: name.into(),
            image_id: "image-id".into(),
            state,
            ..Default::default()
        }
    }

    fn with_phase(phase: Option<PodPhase>) -> PodStatus {
        PodStatus {
            phase,
            ..Default::default()
        }
    }

    #[rstest]
    #[case(None)]
    #[case(Some(PodPhase::Unknown))]
    fn unobserved_pod_is_running(#[case] phase: Option<PodPhase>) {
        let p = project(&pod(with_phase(phase)));
        assert_eq!(p.condition, running());
        assert!(p.steps.is_empty());
    }

    #[test]
    fn succeeded_is_bare_true() {
        let p = project(&pod(with_phase(Some(PodPhase::Succeeded))));
        assert_eq!(p.condition, Condition::bare(ConditionStatus::True));
    }

    #[test]
    fn running_is_building() {
        let p = project(&pod(with_phase(Some(PodPhase::Running))));
        assert!(p.condition.is_unknown());
        assert_eq!(p.condition.reason, REASON_BUILDING);
        assert!(p.condition.message.is_empty());
    }

    #[test]
    fn failed_step_names_container_and_logs_command() {
        let mut status = with_phase(Some(PodPhase::Failed));
        status.message = "ignored".into();
        status.container_statuses = vec![
            step("build-step-ok", ContainerState::terminated(0)),
            step("build-step-broken", ContainerState::terminated(2)),
            step("nop", ContainerState::terminated(1)),
        ];

        let p = project(&pod(status));
        assert!(p.condition.is_false());
        assert!(p.condition.reason.is_empty());
        assert_eq!(
            p.condition.message,
            "build step \"build-step-broken\" exited with code 2 (image: \"image-id\"); \
             for logs run: kubectl -n foo logs test-taskrun-pod -c build-step-broken"
        );
        assert_eq!(p.steps.len(), 3);
        assert_eq!(p.steps[1].name, "build-step-broken");
    }

    #[rstest]
    #[case("evicted", "evicted")]
    #[case("", "build failed for unspecified reasons.")]
    fn failed_without_exit_code_falls_back(#[case] message: &str, #[case] expected: &str) {
        let mut status = with_phase(Some(PodPhase::Failed));
        status.message = message.into();
        assert_eq!(project(&pod(status)).condition.message, expected);
    }

    #[test]
    fn pending_prefers_waiting_step() {
        let mut status = with_phase(Some(PodPhase::Pending));
        status.container_statuses = vec![
            step("build-step-a", ContainerState::waiting("")),
            step("build-step-b", ContainerState::waiting("image pull backoff")),
        ];
        status.conditions = vec![PodCondition {
            type_: "PodScheduled".into(),
            status: ConditionStatus::False,
            reason: String::new(),
            message: "0/1 nodes".into(),
        }];

        let p = project(&pod(status));
        assert_eq!(p.condition.reason, REASON_PENDING);
        assert_eq!(
            p.condition.message,
            "build step \"build-step-b\" is pending with reason \"image pull backoff\""
        );
    }

    #[test]
    fn pending_then_pod_condition() {
        let mut status = with_phase(Some(PodPhase::Pending));
        status.message = "pod message".into();
        status.conditions = vec![PodCondition {
            type_: "PodScheduled".into(),
            status: ConditionStatus::False,
            reason: "Unschedulable".into(),
            message: "0/1 nodes are available".into(),
        }];

        assert_eq!(
            project(&pod(status)).condition.message,
            "pod status \"PodScheduled\":\"False\"; message: \"0/1 nodes are available\""
        );
    }

    #[rstest]
    #[case("pod message", "pod message")]
    #[case("", "Pending")]
    fn pending_fallbacks(#[case] message: &str, #[case] expected: &str) {
        let mut status = with_phase(Some(PodPhase::Pending));
        status.message = message.into();
        assert_eq!(project(&pod(status)).condition.message, expected);
    }

    #[test]
    fn init_containers_are_not_projected() {
        let mut status = with_phase(Some(PodPhase::Running));
        status.init_container_statuses = vec![step("build-step-place-tools", ContainerState::terminated(0))];
        status.container_statuses = vec![step("build-step-a", ContainerState::default())];

        let p = project(&pod(status));
        let names: Vec<_> = p.steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["build-step-a"]);
    }

    #[test]
    fn projection_is_pure() {
        let mut status = with_phase(Some(PodPhase::Failed));
        status.container_statuses = vec![step("build-step-a", ContainerState::terminated(1))];
        let pod = pod(status);
        assert_eq!(project(&pod), project(&pod));
    }
}
