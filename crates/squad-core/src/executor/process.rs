//! Executor running one shell command per teammate and waiting for it

use super::{
    Assignment, Executor, JoinTaskHandle, Submission, TaskOutcome, teammate_command,
    write_assignment,
};
use crate::error::{SquadError, SquadResult};
use crate::layout::StorageLayout;
use crate::mailbox::{CompletionPayload, FailurePayload};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Child;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const STDERR_TAIL_LINES: usize = 20;

/// Attached executor for shell-command teammates.
///
/// The command sees `SQUAD_TEAM`, `SQUAD_MEMBER`, `SQUAD_ROLE` and `SQUAD_ASSIGNMENT`
/// (path of the assignment JSON). Its result is the last stdout line that parses as a
/// completion payload; a non-zero exit or a missing payload is a failure.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    layout: StorageLayout,
    shell: String,
    command: String,
}

impl ProcessExecutor {
    pub fn new(layout: StorageLayout, shell: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            layout,
            shell: shell.into(),
            command: command.into(),
        }
    }
}

#[async_trait]
impl Executor for ProcessExecutor {
    fn name(&self) -> &str {
        "process"
    }

    async fn submit(&self, assignment: Assignment) -> SquadResult<Submission> {
        let assignment_path = write_assignment(&self.layout, &assignment).await?;

        let mut cmd = teammate_command(
            &self.shell,
            &self.command,
            &self.layout,
            &assignment,
            &assignment_path,
        );
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| {
            SquadError::executor(format!("Failed to spawn teammate command: {}", e))
        })?;
        let id = match child.id() {
            Some(pid) => format!("pid:{}", pid),
            None => format!("pid:{}", assignment.agent_id),
        };
        debug!(agent = %assignment.agent_id, %id, "Spawned teammate process");

        let cancel = CancellationToken::new();
        let join = tokio::spawn(run_child(child, cancel.clone()));
        Ok(Submission::Attached(Box::new(JoinTaskHandle::new(id, cancel, join))))
    }
}

async fn run_child(mut child: Child, cancel: CancellationToken) -> TaskOutcome {
    let stdout = tokio::spawn(read_all(child.stdout.take()));
    let stderr = tokio::spawn(read_all(child.stderr.take()));

    let status = tokio::select! {
        _ = cancel.cancelled() => {
            if let Err(e) = child.kill().await {
                warn!("Failed to kill teammate process: {}", e);
            }
            return Err(FailurePayload::new("Cancelled before completion"));
        }
        status = child.wait() => status,
    };

    let stdout = stdout.await.unwrap_or_default();
    let stderr = stderr.await.unwrap_or_default();

    match status {
        Ok(status) if status.success() => parse_completion(&stdout).ok_or_else(|| {
            FailurePayload::new(format!(
                "Teammate exited without a completion payload{}",
                tail_suffix(&stderr)
            ))
        }),
        Ok(status) => Err(FailurePayload::new(format!(
            "Teammate command failed with {}{}",
            status,
            tail_suffix(&stderr)
        ))),
        Err(e) => Err(FailurePayload::new(format!(
            "Failed to wait for teammate command: {}",
            e
        ))),
    }
}

async fn read_all<R: AsyncRead + Unpin>(handle: Option<R>) -> String {
    let mut output = String::new();
    if let Some(mut handle) = handle {
        handle.read_to_string(&mut output).await.ok();
    }
    output
}

/// The last stdout line that is a completion payload
fn parse_completion(stdout: &str) -> Option<CompletionPayload> {
    stdout
        .lines()
        .rev()
        .map(str::trim)
        .filter(|line| line.starts_with('{'))
        .find_map(|line| serde_json::from_str(line).ok())
}

fn tail_suffix(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.is_empty() {
        return String::new();
    }
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    format!(": {}", lines[start..].join("\n"))
}
