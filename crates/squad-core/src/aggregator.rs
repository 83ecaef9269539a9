//! Result aggregation
//!
//! Merges every member's mailbox into one [`AggregateReport`]. The report is derived
//! on each call and never stored, except for the archive snapshot written at shutdown.

use crate::error::SquadResult;
use crate::mailbox::{MailboxStore, Message, first_terminal};
use crate::poller::MemberOutcome;
use crate::team::registry::TeamRegistry;
use crate::team::types::{TeamConfig, TeamMember};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt::Write as _;

/// An artifact tagged with the member that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub member: String,
    pub path: String,
    /// Produced before the member failed
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub partial: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberResult {
    pub name: String,
    pub role: String,
    pub outcome: MemberOutcome,
    pub processed_count: u64,
    pub artifact_count: usize,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metrics: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    pub team: String,
    pub generated_at: DateTime<Utc>,
    /// Sum of `processed_count` over completed members, saturating at `u64::MAX`
    pub total_processed: u64,
    pub completed: usize,
    pub failed: usize,
    pub pending: usize,
    pub artifacts: Vec<Artifact>,
    /// De-duplicated, in first-seen order
    pub errors: Vec<String>,
    /// In registry order
    pub members: Vec<MemberResult>,
}

impl AggregateReport {
    /// Fold the mailboxes of `config`'s members, given in registry order
    pub fn from_mailboxes(config: &TeamConfig, mailboxes: &[(&TeamMember, Vec<Message>)]) -> Self {
        let mut report = Self {
            team: config.name.clone(),
            generated_at: Utc::now(),
            total_processed: 0,
            completed: 0,
            failed: 0,
            pending: 0,
            artifacts: Vec::new(),
            errors: Vec::new(),
            members: Vec::with_capacity(mailboxes.len()),
        };
        let mut seen_errors = HashSet::new();
        let mut push_error = |errors: &mut Vec<String>, error: String| {
            if seen_errors.insert(error.clone()) {
                errors.push(error);
            }
        };

        for (member, messages) in mailboxes {
            let mut result = MemberResult {
                name: member.name.clone(),
                role: member.role.clone(),
                outcome: MemberOutcome::Pending,
                processed_count: 0,
                artifact_count: 0,
                metrics: BTreeMap::new(),
                failure: None,
            };

            match first_terminal(messages) {
                Some(Message::TaskCompleted { payload, .. }) => {
                    result.outcome = MemberOutcome::Completed;
                    result.processed_count = payload.processed_count;
                    result.artifact_count = payload.artifacts.len();
                    result.metrics = payload.metrics.clone();

                    report.completed += 1;
                    report.total_processed = match report
                        .total_processed
                        .checked_add(payload.processed_count)
                    {
                        Some(total) => total,
                        None => {
                            push_error(
                                &mut report.errors,
                                format!("{}: processed count overflows the team total", member.name),
                            );
                            u64::MAX
                        }
                    };
                    report.artifacts.extend(payload.artifacts.iter().map(|path| Artifact {
                        member: member.name.clone(),
                        path: path.clone(),
                        partial: false,
                    }));
                    for error in &payload.errors {
                        push_error(&mut report.errors, error.clone());
                    }
                }
                Some(Message::TaskFailed { payload, .. }) => {
                    result.outcome = MemberOutcome::Failed;
                    result.artifact_count = payload.partial_artifacts.len();
                    result.failure = Some(payload.message.clone());

                    report.failed += 1;
                    report.artifacts.extend(payload.partial_artifacts.iter().map(|path| {
                        Artifact {
                            member: member.name.clone(),
                            path: path.clone(),
                            partial: true,
                        }
                    }));
                    push_error(
                        &mut report.errors,
                        format!("{}: {}", member.name, payload.message),
                    );
                }
                _ => report.pending += 1,
            }

            report.members.push(result);
        }

        report
    }

    pub fn is_complete(&self) -> bool {
        self.pending == 0 && self.failed == 0
    }

    pub fn to_json(&self) -> SquadResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Human-readable rendering of the same report
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Team: {}", self.team);
        let _ = writeln!(
            out,
            "Members: {} completed, {} failed, {} pending",
            self.completed, self.failed, self.pending
        );
        let _ = writeln!(out, "Total processed: {}", self.total_processed);

        if !self.members.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(
                out,
                "{:<20} {:<20} {:<10} {:>9} {:>9}",
                "MEMBER", "ROLE", "OUTCOME", "PROCESSED", "ARTIFACTS"
            );
            for member in &self.members {
                let _ = writeln!(
                    out,
                    "{:<20} {:<20} {:<10} {:>9} {:>9}",
                    member.name,
                    member.role,
                    member.outcome.to_string(),
                    member.processed_count,
                    member.artifact_count
                );
                for (key, value) in &member.metrics {
                    let _ = writeln!(out, "    {} = {}", key, value);
                }
            }
        }

        if !self.artifacts.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Artifacts:");
            for artifact in &self.artifacts {
                let marker = if artifact.partial { " (partial)" } else { "" };
                let _ = writeln!(out, "  [{}] {}{}", artifact.member, artifact.path, marker);
            }
        }

        if !self.errors.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Errors:");
            for error in &self.errors {
                let _ = writeln!(out, "  - {}", error);
            }
        }

        out
    }
}

/// Builds aggregate reports from a team's mailboxes
#[derive(Debug, Clone)]
pub struct Aggregator {
    registry: TeamRegistry,
    store: MailboxStore,
}

impl Aggregator {
    pub fn new(registry: TeamRegistry, store: MailboxStore) -> Self {
        Self { registry, store }
    }

    pub async fn aggregate(&self, team: &str) -> SquadResult<AggregateReport> {
        let _guard = self.registry.locks().read(team).await;
        let config = self.registry.require_unlocked(team).await?;
        self.aggregate_config(&config).await
    }

    pub(crate) async fn aggregate_config(&self, config: &TeamConfig) -> SquadResult<AggregateReport> {
        let mut mailboxes = Vec::with_capacity(config.members.len());
        for member in &config.members {
            let messages = self.store.read_all(&config.name, &member.name).await?;
            mailboxes.push((member, messages));
        }
        Ok(AggregateReport::from_mailboxes(config, &mailboxes))
    }
}
