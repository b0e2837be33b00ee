//! Interactive remote shells via `aws ecs execute-command`.

use std::process::Command;

use crate::config::FALLBACK_CONTAINER;
use crate::error::{FleetError, Result};
use crate::model::Task;

/// Everything needed to exec into one container.
#[derive(Clone, Debug, PartialEq)]
pub struct ShellTarget {
    pub cluster: String,
    pub region: String,
    pub task_id: String,
    pub container: String,
}

impl ShellTarget {
    pub fn for_task(cluster: &str, region: &str, task: &Task) -> Self {
        let container = if task.container.is_empty() {
            FALLBACK_CONTAINER.to_string()
        } else {
            task.container.clone()
        };
        Self {
            cluster: cluster.to_string(),
            region: region.to_string(),
            task_id: task.id.clone(),
            container,
        }
    }

    pub fn args(&self) -> Vec<String> {
        [
            "ecs",
            "execute-command",
            "--region",
            self.region.as_str(),
            "--cluster",
            self.cluster.as_str(),
            "--task",
            self.task_id.as_str(),
            "--container",
            self.container.as_str(),
            "--interactive",
            "--command",
            "/bin/bash",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }
}

/// Pick a RUNNING task, else the first one.
pub fn pick_task<'a>(service: &str, tasks: &'a [Task]) -> Result<&'a Task> {
    tasks
        .iter()
        .find(|t| t.status == "RUNNING")
        .or_else(|| tasks.first())
        .ok_or_else(|| FleetError::not_found(format!("no running tasks for {}", service)))
}

/// Run the shell in the foreground. The caller owns the terminal mode.
pub fn launch(target: &ShellTarget) -> Result<()> {
    let status = Command::new("aws")
        .args(target.args())
        .status()
        .map_err(|source| FleetError::Spawn { program: "aws", source })?;
    if status.success() {
        Ok(())
    } else {
        Err(FleetError::CommandFailed {
            program: "aws",
            action: "ecs execute-command".to_string(),
            stderr: status.to_string(),
        })
    }
}
