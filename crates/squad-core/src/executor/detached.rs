//! Executor handing assignments to external workers

use super::{Assignment, Executor, Submission, teammate_command, write_assignment};
use crate::error::{SquadError, SquadResult};
use crate::layout::StorageLayout;
use async_trait::async_trait;
use std::process::Stdio;
use tracing::{debug, info};

/// Writes the assignment file and, when a command is configured, launches it without
/// waiting. The worker reports through its mailbox (e.g. `squad post`), so the lead
/// process may exit right after spawning.
#[derive(Debug, Clone)]
pub struct DetachedExecutor {
    layout: StorageLayout,
    shell: String,
    command: Option<String>,
}

impl DetachedExecutor {
    pub fn new(layout: StorageLayout, shell: impl Into<String>, command: Option<String>) -> Self {
        Self {
            layout,
            shell: shell.into(),
            command,
        }
    }
}

#[async_trait]
impl Executor for DetachedExecutor {
    fn name(&self) -> &str {
        "detached"
    }

    async fn submit(&self, assignment: Assignment) -> SquadResult<Submission> {
        let assignment_path = write_assignment(&self.layout, &assignment).await?;

        let Some(command) = self.command.as_deref() else {
            info!(
                agent = %assignment.agent_id,
                assignment = %assignment_path.display(),
                "Assignment written; waiting for an external worker"
            );
            return Ok(Submission::Detached {
                reference: format!("assignment:{}", assignment_path.display()),
            });
        };

        let mut cmd = teammate_command(
            &self.shell,
            command,
            &self.layout,
            &assignment,
            &assignment_path,
        );
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        let child = cmd.spawn().map_err(|e| {
            SquadError::executor(format!("Failed to launch teammate command: {}", e))
        })?;
        let reference = match child.id() {
            Some(pid) => format!("pid:{}", pid),
            None => format!("assignment:{}", assignment_path.display()),
        };
        debug!(agent = %assignment.agent_id, %reference, "Launched detached teammate");

        Ok(Submission::Detached { reference })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::test_support;
    use std::time::Duration;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_without_command_only_writes_assignment() {
        let tmp = TempDir::new().unwrap();
        let layout = StorageLayout::new(tmp.path().join("teams"), tmp.path().join("archive"));
        let executor = DetachedExecutor::new(layout.clone(), "sh", None);

        let submission = executor
            .submit(test_support::assignment(&layout, "alpha", "unit-1"))
            .await
            .unwrap();
        assert!(submission.reference().starts_with("assignment:"));
        assert!(layout.assignment_path("alpha", "unit-1").exists());
    }

    #[tokio::test]
    async fn test_launches_command_with_environment() {
        let tmp = TempDir::new().unwrap();
        let layout = StorageLayout::new(tmp.path().join("teams"), tmp.path().join("archive"));
        let marker = tmp.path().join("marker");
        let executor = DetachedExecutor::new(
            layout.clone(),
            "sh",
            Some(format!(
                "echo \"$SQUAD_TEAM/$SQUAD_MEMBER/$SQUAD_ROLE\" > {}",
                marker.display()
            )),
        );

        let submission = executor
            .submit(test_support::assignment(&layout, "alpha", "unit-1"))
            .await
            .unwrap();
        assert!(submission.reference().starts_with("pid:"));

        let mut content = String::new();
        for _ in 0..100 {
            content = std::fs::read_to_string(&marker).unwrap_or_default();
            if !content.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(content.trim(), "alpha/unit-1/unit-tester");
    }
}
