//! Executor boundary
//!
//! The lead never runs a teammate's work itself. It hands an [`Assignment`] to an
//! [`Executor`], which either keeps a handle on the running task ([`Submission::Attached`])
//! or lets an external worker take it over ([`Submission::Detached`]). Attached outcomes are
//! relayed into the member's mailbox by the spawner; detached workers write their mailbox
//! themselves.

pub mod detached;
pub mod in_process;
pub mod process;

pub use detached::DetachedExecutor;
pub use in_process::{InProcessExecutor, JoinTaskHandle};
pub use process::ProcessExecutor;

use crate::error::{SquadError, SquadResult};
use crate::layout::StorageLayout;
use crate::mailbox::{CompletionPayload, FailurePayload};
use crate::partition::Target;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Outcome of one teammate run
pub type TaskOutcome = Result<CompletionPayload, FailurePayload>;

/// Everything a teammate needs to run, handed over at submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub team: String,
    pub member: String,
    pub agent_id: String,
    pub role: String,
    pub instructions: String,
    pub targets: Vec<Target>,
    #[serde(default)]
    pub reference_paths: Vec<PathBuf>,
    /// Mailbox the teammate appends its results to
    pub mailbox_path: PathBuf,
    /// Control log the teammate watches for shutdown requests
    pub control_path: PathBuf,
}

/// A task kept under the lead's supervision
#[async_trait]
pub trait TaskHandle: Send {
    /// Executor-specific reference (task id, pid, ...)
    fn id(&self) -> &str;

    /// Token that stops the task when cancelled
    fn cancel_token(&self) -> CancellationToken;

    /// Request cancellation; best effort
    fn cancel(&self) {
        self.cancel_token().cancel();
    }

    /// Wait for the task to finish
    async fn result(self: Box<Self>) -> TaskOutcome;
}

/// Result of an accepted submission
pub enum Submission {
    /// The executor keeps running the task; its outcome is relayed by the lead
    Attached(Box<dyn TaskHandle>),
    /// An external worker took over and writes the mailbox itself
    Detached { reference: String },
}

impl Submission {
    pub fn reference(&self) -> String {
        match self {
            Self::Attached(handle) => handle.id().to_string(),
            Self::Detached { reference } => reference.clone(),
        }
    }
}

impl std::fmt::Debug for Submission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Attached(handle) => f.debug_tuple("Attached").field(&handle.id()).finish(),
            Self::Detached { reference } => f
                .debug_struct("Detached")
                .field("reference", reference)
                .finish(),
        }
    }
}

/// Runs teammates
#[async_trait]
pub trait Executor: Send + Sync {
    /// Executor name for logging
    fn name(&self) -> &str;

    /// Submit an assignment. An error means the submission was rejected.
    async fn submit(&self, assignment: Assignment) -> SquadResult<Submission>;
}

/// Write the assignment to `assignments/{member}.json` and return its path
pub async fn write_assignment(
    layout: &StorageLayout,
    assignment: &Assignment,
) -> SquadResult<PathBuf> {
    let dir = layout.assignment_dir(&assignment.team);
    tokio::fs::create_dir_all(&dir).await.map_err(|e| {
        SquadError::io_with_path(format!("Failed to create assignment directory: {}", e), &dir)
    })?;

    let path = layout.assignment_path(&assignment.team, &assignment.member);
    let json = serde_json::to_string_pretty(assignment)?;
    tokio::fs::write(&path, json).await.map_err(|e| {
        SquadError::io_with_path(format!("Failed to write assignment: {}", e), &path)
    })?;
    Ok(path)
}

/// Shell command prepared with the teammate environment
pub(crate) fn teammate_command(
    shell: &str,
    command: &str,
    layout: &StorageLayout,
    assignment: &Assignment,
    assignment_path: &Path,
) -> Command {
    let mut cmd = Command::new(shell);
    cmd.arg("-c").arg(command);
    cmd.env("SQUAD_AGENT_TEAMS", "1")
        .env("SQUAD_TEAMS_DIR", layout.teams_dir())
        .env("SQUAD_TEAM", &assignment.team)
        .env("SQUAD_MEMBER", &assignment.member)
        .env("SQUAD_ROLE", &assignment.role)
        .env("SQUAD_ASSIGNMENT", assignment_path);
    cmd
}
