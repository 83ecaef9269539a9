//! Team shutdown
//!
//! Graceful shutdown asks every member to stop through its control log and waits, up
//! to one shared deadline, for a `shutdown_ack` or a terminal message. Forced shutdown
//! skips the exchange. Both finish with a final aggregation and removal of the team's
//! storage, optionally archiving the final report first.

use crate::aggregator::{AggregateReport, Aggregator};
use crate::error::{SquadError, SquadResult};
use crate::layout::StorageLayout;
use crate::mailbox::{ControlMessage, MailboxStore, Message, MessageKind};
use crate::poller::MemberOutcome;
use crate::team::registry::TeamRegistry;
use crate::team::types::{MemberStatus, TeamConfig, TeamStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Sender recorded on shutdown requests
pub const LEAD_ID: &str = "team-lead";

/// Archives of one team within the same second before giving up
const MAX_ARCHIVE_SEQUENCE: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownMode {
    #[default]
    Graceful,
    Forced,
}

impl fmt::Display for ShutdownMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Graceful => f.write_str("graceful"),
            Self::Forced => f.write_str("forced"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ShutdownOptions {
    pub mode: ShutdownMode,
    /// Archive the final report and registry before removing storage
    pub keep_results: bool,
    /// Shared deadline for all acknowledgements
    pub ack_timeout: Duration,
    /// Re-read interval while waiting for acknowledgements
    pub interval: Duration,
}

impl ShutdownOptions {
    pub fn graceful(ack_timeout: Duration) -> Self {
        Self {
            mode: ShutdownMode::Graceful,
            keep_results: false,
            ack_timeout,
            interval: Duration::from_millis(100),
        }
    }

    pub fn forced() -> Self {
        Self {
            mode: ShutdownMode::Forced,
            keep_results: false,
            ack_timeout: Duration::ZERO,
            interval: Duration::from_millis(100),
        }
    }

    pub fn keep_results(mut self, keep: bool) -> Self {
        self.keep_results = keep;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownReport {
    pub team: String,
    pub mode: ShutdownMode,
    pub acknowledged: Vec<String>,
    pub unresponsive: Vec<String>,
    /// Best effort; absent when the final aggregation failed
    pub final_report: Option<AggregateReport>,
    pub archive_path: Option<PathBuf>,
}

/// What gets written to the archive directory when results are kept
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveRecord {
    pub archived_at: DateTime<Utc>,
    pub team: TeamConfig,
    pub report: Option<AggregateReport>,
}

#[derive(Debug, Clone)]
pub struct ShutdownCoordinator {
    registry: TeamRegistry,
    store: MailboxStore,
    aggregator: Aggregator,
}

impl ShutdownCoordinator {
    pub fn new(registry: TeamRegistry, store: MailboxStore) -> Self {
        let aggregator = Aggregator::new(registry.clone(), store.clone());
        Self {
            registry,
            store,
            aggregator,
        }
    }

    /// Shut `team` down. A team left `shutting_down` or `archived` by an earlier,
    /// interrupted shutdown is accepted, so a retry always finishes the cleanup.
    pub async fn shutdown(&self, team: &str, options: &ShutdownOptions) -> SquadResult<ShutdownReport> {
        let resumed = self
            .registry
            .update(team, |config| match config.status {
                TeamStatus::Forming | TeamStatus::Active => {
                    config.advance(TeamStatus::ShuttingDown)?;
                    Ok(false)
                }
                TeamStatus::ShuttingDown | TeamStatus::Archived => Ok(true),
            })
            .await?;
        if resumed {
            warn!(team, "Resuming an interrupted shutdown");
        }

        let config = self.record_outcomes(team).await?;
        info!(team, mode = %options.mode, members = config.members.len(), "Shutting down team");

        let (acknowledged, unresponsive) = match options.mode {
            ShutdownMode::Graceful => self.request_and_collect_acks(&config, options).await?,
            ShutdownMode::Forced => (Vec::new(), Vec::new()),
        };

        let final_report = match self.aggregator.aggregate(team).await {
            Ok(report) => Some(report),
            Err(e) => {
                warn!(team, "Final aggregation failed: {}", e);
                None
            }
        };

        let archive_path = if options.keep_results {
            Some(self.archive(team, final_report.clone()).await?)
        } else {
            None
        };

        self.registry.remove(team).await?;
        info!(
            team,
            acknowledged = acknowledged.len(),
            unresponsive = unresponsive.len(),
            archived = archive_path.is_some(),
            "Team shut down"
        );

        Ok(ShutdownReport {
            team: team.to_string(),
            mode: options.mode,
            acknowledged,
            unresponsive,
            final_report,
            archive_path,
        })
    }

    /// Apply the completed/failed statuses the mailboxes already report, so the
    /// registry (and any archive of it) records each member's result
    async fn record_outcomes(&self, team: &str) -> SquadResult<TeamConfig> {
        let config = self.registry.load(team).await?;
        let mut observed = Vec::new();
        for member in &config.members {
            let messages = self.store.read_all(team, &member.name).await?;
            if let Some(next) = MemberOutcome::from_messages(&messages).implied_status() {
                observed.push((member.name.clone(), next));
            }
        }

        self.registry
            .update(team, |config| {
                for (name, next) in &observed {
                    if let Some(member) = config.member_mut(name) {
                        if member.status.can_advance_to(*next) {
                            member.advance(*next)?;
                        }
                    }
                }
                Ok(config.clone())
            })
            .await
    }

    async fn request_and_collect_acks(
        &self,
        config: &TeamConfig,
        options: &ShutdownOptions,
    ) -> SquadResult<(Vec<String>, Vec<String>)> {
        let team = config.name.as_str();
        let targets: Vec<String> = config
            .members
            .iter()
            .filter(|m| m.status != MemberStatus::ShutDown)
            .map(|m| m.name.clone())
            .collect();

        for name in &targets {
            let request = ControlMessage::shutdown_request(LEAD_ID, Some("team shutdown".to_string()));
            if let Err(e) = self.store.send_control(team, name, &request).await {
                warn!(team, member = %name, "Failed to send shutdown request: {}", e);
            }
        }
        self.registry
            .update(team, |config| {
                for member in config.members.iter_mut() {
                    if targets.contains(&member.name) && member.status != MemberStatus::Spawning {
                        member.advance(MemberStatus::ShutdownRequested)?;
                    }
                }
                Ok(())
            })
            .await?;

        let started = Instant::now();
        let deadline = started
            .checked_add(options.ack_timeout)
            .unwrap_or_else(|| started + Duration::from_secs(60 * 60 * 24));
        let notify = self.store.notifier();
        let mut acknowledged: Vec<String> = Vec::new();

        loop {
            let notified = notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            for name in &targets {
                if acknowledged.contains(name) {
                    continue;
                }
                let messages = self.store.read_all(team, name).await?;
                if messages.iter().any(counts_as_ack) {
                    debug!(team, member = %name, "Shutdown acknowledged");
                    acknowledged.push(name.clone());
                }
            }

            if acknowledged.len() == targets.len() || Instant::now() >= deadline {
                break;
            }

            tokio::select! {
                _ = &mut notified => {}
                _ = tokio::time::sleep(options.interval) => {}
                _ = tokio::time::sleep_until(deadline) => {}
            }
        }

        let acknowledged: Vec<String> = targets
            .iter()
            .filter(|name| acknowledged.contains(name))
            .cloned()
            .collect();
        let unresponsive: Vec<String> = targets
            .iter()
            .filter(|name| !acknowledged.contains(name))
            .cloned()
            .collect();
        for name in &unresponsive {
            warn!(
                team,
                member = %name,
                waited_ms = started.elapsed().as_millis() as u64,
                "Member did not acknowledge shutdown"
            );
        }

        self.registry
            .update(team, |config| {
                for member in config.members.iter_mut() {
                    if acknowledged.contains(&member.name) {
                        member.advance(MemberStatus::ShutDown)?;
                    }
                }
                Ok(())
            })
            .await?;

        Ok((acknowledged, unresponsive))
    }

    /// Write the archive first and mark the team archived only once it is on disk,
    /// so a failed write leaves the team in a state a retry can finish
    async fn archive(&self, team: &str, report: Option<AggregateReport>) -> SquadResult<PathBuf> {
        let mut config = self.registry.load(team).await?;
        config.advance(TeamStatus::Archived)?;

        let archived_at = Utc::now();
        let record = ArchiveRecord {
            archived_at,
            team: config,
            report,
        };
        let json = serde_json::to_string_pretty(&record)?;
        let path = write_archive(self.registry.layout(), team, archived_at, &json).await?;

        self.registry
            .update(team, |config| {
                config.advance(TeamStatus::Archived)?;
                Ok(())
            })
            .await?;

        info!(team, path = %path.display(), "Archived team results");
        Ok(path)
    }
}

/// Write `json` to an archive file that did not exist before; earlier archives of a
/// reused team name are never overwritten
async fn write_archive(
    layout: &StorageLayout,
    team: &str,
    at: DateTime<Utc>,
    json: &str,
) -> SquadResult<PathBuf> {
    let dir = layout.archive_dir();
    tokio::fs::create_dir_all(dir).await.map_err(|e| {
        SquadError::io_with_path(format!("Failed to create archive directory: {}", e), dir)
    })?;

    for sequence in 0..MAX_ARCHIVE_SEQUENCE {
        let path = layout.archive_path(team, at, sequence);
        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(e) => {
                return Err(SquadError::io_with_path(
                    format!("Failed to create archive: {}", e),
                    &path,
                ));
            }
        };

        file.write_all(json.as_bytes())
            .await
            .map_err(|e| SquadError::io_with_path(format!("Failed to write archive: {}", e), &path))?;
        file.flush()
            .await
            .map_err(|e| SquadError::io_with_path(format!("Failed to flush archive: {}", e), &path))?;
        return Ok(path);
    }

    Err(SquadError::storage(format!(
        "No free archive file name for team '{}' at {}",
        team, at
    )))
}

/// A terminal message answers a shutdown request as well as an explicit ack
fn counts_as_ack(message: &Message) -> bool {
    message.is_terminal() || message.kind() == MessageKind::ShutdownAck
}
