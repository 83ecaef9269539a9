//! Completion polling
//!
//! A snapshot reads every selected mailbox once and classifies each member. A wait
//! repeats snapshots until every member completed (`success`), any member failed
//! (`failure`, checked first), or the deadline passed (`timeout`). Reads never mutate
//! anything; the status refresh in the team manager applies what they derive.

use crate::error::{SquadError, SquadResult};
use crate::mailbox::{MailboxStore, Message, first_terminal};
use crate::team::registry::TeamRegistry;
use crate::team::types::{MemberStatus, TeamConfig, TeamMember};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Stand-in deadline for timeouts too large to represent
const FAR_FUTURE: Duration = Duration::from_secs(60 * 60 * 24 * 365);

/// Completion state of one member, derived from its mailbox
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberOutcome {
    Pending,
    Completed,
    Failed,
}

impl MemberOutcome {
    /// Outcome from the first terminal message; later ones never change it
    pub fn from_messages(messages: &[Message]) -> Self {
        match first_terminal(messages) {
            Some(Message::TaskCompleted { .. }) => Self::Completed,
            Some(_) => Self::Failed,
            None => Self::Pending,
        }
    }

    /// Registry status this outcome implies, if any
    pub fn implied_status(self) -> Option<MemberStatus> {
        match self {
            Self::Pending => None,
            Self::Completed => Some(MemberStatus::Completed),
            Self::Failed => Some(MemberStatus::Failed),
        }
    }
}

impl fmt::Display for MemberOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberSnapshot {
    pub name: String,
    pub agent_id: String,
    pub role: String,
    /// Status recorded in the registry at snapshot time
    pub status: MemberStatus,
    pub outcome: MemberOutcome,
    /// Latest processed count reported by progress or completion
    pub processed_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    pub message_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<DateTime<Utc>>,
}

impl MemberSnapshot {
    pub(crate) fn from_mailbox(member: &TeamMember, messages: &[Message]) -> Self {
        let outcome = MemberOutcome::from_messages(messages);

        let terminal_count = messages.iter().filter(|m| m.is_terminal()).count();
        if terminal_count > 1 {
            warn!(
                agent = %member.agent_id,
                terminal_count,
                "Mailbox holds more than one terminal message; using the first"
            );
        }

        let mut processed_count = 0;
        let mut failure = None;
        for message in messages {
            match message {
                Message::Progress { payload, .. } => processed_count = payload.processed_count,
                _ if message.is_terminal() => break,
                _ => {}
            }
        }
        match first_terminal(messages) {
            Some(Message::TaskCompleted { payload, .. }) => processed_count = payload.processed_count,
            Some(Message::TaskFailed { payload, .. }) => failure = Some(payload.message.clone()),
            _ => {}
        }

        Self {
            name: member.name.clone(),
            agent_id: member.agent_id.clone(),
            role: member.role.clone(),
            status: member.status,
            outcome,
            processed_count,
            failure,
            message_count: messages.len(),
            last_activity: messages.last().map(Message::timestamp),
        }
    }
}

/// One classification pass over a team
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub team: String,
    pub taken_at: DateTime<Utc>,
    pub members: Vec<MemberSnapshot>,
}

impl Snapshot {
    fn names_with(&self, outcome: MemberOutcome) -> Vec<String> {
        self.members
            .iter()
            .filter(|m| m.outcome == outcome)
            .map(|m| m.name.clone())
            .collect()
    }

    pub fn completed(&self) -> Vec<String> {
        self.names_with(MemberOutcome::Completed)
    }

    pub fn pending(&self) -> Vec<String> {
        self.names_with(MemberOutcome::Pending)
    }

    pub fn failed(&self) -> Vec<String> {
        self.names_with(MemberOutcome::Failed)
    }

    pub fn any_failed(&self) -> bool {
        self.members.iter().any(|m| m.outcome == MemberOutcome::Failed)
    }

    /// True for an empty selection
    pub fn all_completed(&self) -> bool {
        self.members
            .iter()
            .all(|m| m.outcome == MemberOutcome::Completed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitResult {
    Success,
    Failure,
    Timeout,
}

impl fmt::Display for WaitResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Timeout => "timeout",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct WaitOptions {
    pub timeout: Duration,
    /// Re-read interval for writers outside this process
    pub interval: Duration,
    /// Restrict the wait to one member
    pub member: Option<String>,
}

impl WaitOptions {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self {
            timeout,
            interval,
            member: None,
        }
    }

    pub fn for_member(mut self, member: impl Into<String>) -> Self {
        self.member = Some(member.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct WaitOutcome {
    pub result: WaitResult,
    /// Snapshot the result was decided on
    pub snapshot: Snapshot,
    pub elapsed: Duration,
}

impl WaitOutcome {
    pub fn completed(&self) -> Vec<String> {
        self.snapshot.completed()
    }

    pub fn pending(&self) -> Vec<String> {
        self.snapshot.pending()
    }

    pub fn failed(&self) -> Vec<String> {
        self.snapshot.failed()
    }
}

/// Reads mailboxes to derive member completion
#[derive(Debug, Clone)]
pub struct Poller {
    registry: TeamRegistry,
    store: MailboxStore,
}

impl Poller {
    pub fn new(registry: TeamRegistry, store: MailboxStore) -> Self {
        Self { registry, store }
    }

    /// Classify every member (or just `member`) once; never blocks on teammates
    pub async fn snapshot(&self, team: &str, member: Option<&str>) -> SquadResult<Snapshot> {
        let _guard = self.registry.locks().read(team).await;
        let config = self.registry.require_unlocked(team).await?;
        self.snapshot_of(&config, member).await
    }

    pub(crate) async fn snapshot_of(
        &self,
        config: &TeamConfig,
        member: Option<&str>,
    ) -> SquadResult<Snapshot> {
        let selected: Vec<&TeamMember> = match member {
            Some(name) => vec![config.member(name).ok_or_else(|| {
                SquadError::member_not_found(&config.name, name)
            })?],
            None => config.members.iter().collect(),
        };

        let mut members = Vec::with_capacity(selected.len());
        for member in selected {
            let messages = self.store.read_all(&config.name, &member.name).await?;
            members.push(MemberSnapshot::from_mailbox(member, &messages));
        }

        Ok(Snapshot {
            team: config.name.clone(),
            taken_at: Utc::now(),
            members,
        })
    }

    /// Wait until success, failure or timeout.
    ///
    /// In-process appends wake the wait immediately; other writers are picked up on the
    /// next interval tick.
    pub async fn wait(&self, team: &str, options: &WaitOptions) -> SquadResult<WaitOutcome> {
        let started = Instant::now();
        let deadline = started
            .checked_add(options.timeout)
            .unwrap_or_else(|| started + FAR_FUTURE);
        let notify = self.store.notifier();
        let member = options.member.as_deref();

        loop {
            let notified = notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let snapshot = self.snapshot(team, member).await?;
            let result = if snapshot.any_failed() {
                Some(WaitResult::Failure)
            } else if snapshot.all_completed() {
                Some(WaitResult::Success)
            } else if Instant::now() >= deadline {
                Some(WaitResult::Timeout)
            } else {
                None
            };

            if let Some(result) = result {
                let elapsed = started.elapsed();
                debug!(team, %result, elapsed_ms = elapsed.as_millis() as u64, "Wait finished");
                return Ok(WaitOutcome {
                    result,
                    snapshot,
                    elapsed,
                });
            }

            tokio::select! {
                _ = &mut notified => {}
                _ = tokio::time::sleep(options.interval) => {}
                _ = tokio::time::sleep_until(deadline) => {}
            }
        }
    }
}
