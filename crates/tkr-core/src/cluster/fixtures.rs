use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use tkr_model::{ClusterTask, PipelineResource, Pod, Secret, ServiceAccount, Task, TaskRun};

use crate::error::ConfigError;

/// Seed objects for an [`InMemoryCluster`](crate::cluster::InMemoryCluster), as JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Fixtures {
    pub task_runs: Vec<TaskRun>,
    pub tasks: Vec<Task>,
    pub cluster_tasks: Vec<ClusterTask>,
    pub pipeline_resources: Vec<PipelineResource>,
    pub pods: Vec<Pod>,
    pub service_accounts: Vec<ServiceAccount>,
    pub secrets: Vec<Secret>,
}

impl Fixtures {
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cluster::InMemoryCluster, ports::ClusterClient};

    const SAMPLE: &str = r#"{
        "tasks": [{
            "metadata": {"name": "build", "namespace": "foo"},
            "spec": {"steps": [{"name": "compile", "image": "gcc", "command": ["make"]}]}
        }],
        "clusterTasks": [{
            "metadata": {"name": "shared"},
            "spec": {}
        }],
        "taskRuns": [{
            "metadata": {"name": "build-run", "namespace": "foo"},
            "spec": {"taskRef": {"name": "build"}, "timeout": "10m"}
        }]
    }"#;

    #[tokio::test]
    async fn seeds_cluster_from_json() {
        let fixtures = Fixtures::from_json(SAMPLE).unwrap();
        assert_eq!(fixtures.tasks.len(), 1);
        assert!(fixtures.pods.is_empty());

        let cluster = InMemoryCluster::from_fixtures(fixtures);
        assert_eq!(cluster.task_run_keys().await, ["foo/build-run"]);
        assert_eq!(cluster.get_task("foo", "build").await.unwrap().spec.steps.len(), 1);
        assert!(cluster.get_cluster_task("shared").await.is_ok());
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            Fixtures::from_json(r#"{"taskRuns": 3}"#),
            Err(ConfigError::Parse(_))
        ));
    }
}
