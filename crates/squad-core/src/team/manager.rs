//! Team manager
//!
//! Single entry point for the lead. Wires registry, mailboxes, executor, poller,
//! aggregator and shutdown coordinator together, and refuses every operation while
//! agent teams are disabled.

use super::registry::TeamRegistry;
use super::types::{TeamConfig, TeamMember};
use crate::aggregator::{AggregateReport, Aggregator};
use crate::config::SquadConfig;
use crate::error::{SquadError, SquadResult};
use crate::executor::{DetachedExecutor, Executor};
use crate::layout::StorageLayout;
use crate::mailbox::MailboxStore;
use crate::partition::{Partition, PartitionMode, Target, partition};
use crate::poller::{Poller, Snapshot, WaitOptions, WaitOutcome};
use crate::shutdown::{ShutdownCoordinator, ShutdownMode, ShutdownOptions, ShutdownReport};
use crate::spawner::{MemberHandle, SpawnRequest, Spawner};
use crate::teammate::Teammate;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const RELAY_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Registry record plus what the mailboxes currently say
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamStatusReport {
    pub team: TeamConfig,
    pub snapshot: Snapshot,
}

pub struct TeamManager {
    config: SquadConfig,
    registry: TeamRegistry,
    store: MailboxStore,
    executor: Arc<dyn Executor>,
    spawner: Spawner,
    poller: Poller,
    aggregator: Aggregator,
    shutdown: ShutdownCoordinator,
    /// Relays of attached members, by team
    handles: DashMap<String, Vec<MemberHandle>>,
}

impl TeamManager {
    pub fn new(config: SquadConfig, executor: Arc<dyn Executor>) -> Self {
        let layout = StorageLayout::from(&config);
        let registry = TeamRegistry::new(layout.clone());
        let store = MailboxStore::new(layout);
        let spawner = Spawner::new(
            registry.clone(),
            store.clone(),
            Arc::clone(&executor),
            config.poll_interval(),
        );

        Self {
            poller: Poller::new(registry.clone(), store.clone()),
            aggregator: Aggregator::new(registry.clone(), store.clone()),
            shutdown: ShutdownCoordinator::new(registry.clone(), store.clone()),
            config,
            registry,
            store,
            executor,
            spawner,
            handles: DashMap::new(),
        }
    }

    /// Manager handing assignments to external workers, launching the configured
    /// executor command when there is one
    pub fn detached(config: SquadConfig) -> Self {
        let executor = DetachedExecutor::new(
            StorageLayout::from(&config),
            config.executor.shell.clone(),
            config.executor.command.clone(),
        );
        Self::new(config, Arc::new(executor))
    }

    pub fn config(&self) -> &SquadConfig {
        &self.config
    }

    pub fn registry(&self) -> &TeamRegistry {
        &self.registry
    }

    pub fn store(&self) -> &MailboxStore {
        &self.store
    }

    pub fn executor_name(&self) -> &str {
        self.executor.name()
    }

    fn ensure_enabled(&self) -> SquadResult<()> {
        if self.config.enabled {
            Ok(())
        } else {
            Err(SquadError::Disabled)
        }
    }

    pub async fn spawn(&self, team: &str, request: SpawnRequest) -> SquadResult<TeamMember> {
        self.ensure_enabled()?;
        let handle = self.spawner.spawn(team, request).await?;
        let member = handle.member.clone();
        if handle.is_attached() {
            self.handles.entry(team.to_string()).or_default().push(handle);
        }
        Ok(member)
    }

    /// Spawn one member per non-empty bucket, named `{bucket}-{n}`
    pub async fn spawn_partition(
        &self,
        team: &str,
        partition: &Partition,
        instructions: &str,
    ) -> SquadResult<Vec<TeamMember>> {
        self.ensure_enabled()?;
        let mut members = Vec::new();
        for (index, bucket) in partition.non_empty().enumerate() {
            let role = match partition.mode {
                PartitionMode::ByRole => bucket.key.clone(),
                PartitionMode::ByModule => crate::partition::DEFAULT_ROLE.to_string(),
            };
            let name = format!("{}-{}", sanitize(&bucket.key), index + 1);
            let request = SpawnRequest::new(name, role)
                .with_instructions(instructions)
                .with_targets(bucket.targets.clone());
            members.push(self.spawn(team, request).await?);
        }
        Ok(members)
    }

    pub async fn snapshot(&self, team: &str, member: Option<&str>) -> SquadResult<Snapshot> {
        self.ensure_enabled()?;
        let snapshot = self.poller.snapshot(team, member).await?;
        self.refresh(&snapshot).await?;
        Ok(snapshot)
    }

    pub async fn wait(&self, team: &str, options: &WaitOptions) -> SquadResult<WaitOutcome> {
        self.ensure_enabled()?;
        let outcome = self.poller.wait(team, options).await?;
        self.refresh(&outcome.snapshot).await?;
        Ok(outcome)
    }

    /// Wait options from the configured defaults
    pub fn wait_options(&self, timeout: Option<Duration>) -> WaitOptions {
        WaitOptions::new(
            timeout.unwrap_or_else(|| self.config.default_wait_timeout()),
            self.config.poll_interval(),
        )
    }

    pub async fn status(&self, team: &str) -> SquadResult<TeamStatusReport> {
        self.ensure_enabled()?;
        let snapshot = self.poller.snapshot(team, None).await?;
        let team = self.refresh(&snapshot).await?;
        Ok(TeamStatusReport { team, snapshot })
    }

    pub async fn aggregate(&self, team: &str) -> SquadResult<AggregateReport> {
        self.ensure_enabled()?;
        let snapshot = self.poller.snapshot(team, None).await?;
        self.refresh(&snapshot).await?;
        self.aggregator.aggregate(team).await
    }

    /// Shutdown options from the configured defaults
    pub fn shutdown_options(&self, mode: ShutdownMode, ack_timeout: Option<Duration>) -> ShutdownOptions {
        let options = match mode {
            ShutdownMode::Graceful => ShutdownOptions::graceful(
                ack_timeout.unwrap_or_else(|| self.config.shutdown_ack_timeout()),
            ),
            ShutdownMode::Forced => ShutdownOptions::forced(),
        };
        options.with_interval(self.config.poll_interval())
    }

    pub async fn shutdown(&self, team: &str, options: &ShutdownOptions) -> SquadResult<ShutdownReport> {
        self.ensure_enabled()?;
        let handles = self
            .handles
            .remove(team)
            .map(|(_, handles)| handles)
            .unwrap_or_default();

        let handles = if options.mode == ShutdownMode::Forced {
            self.stop_relays(team, handles).await;
            Vec::new()
        } else {
            handles
        };

        let result = self.shutdown.shutdown(team, options).await;
        // relays of members that never acknowledged must not outlive their storage
        self.stop_relays(team, handles).await;
        result
    }

    async fn stop_relays(&self, team: &str, handles: Vec<MemberHandle>) {
        if handles.is_empty() {
            return;
        }
        debug!(team, relays = handles.len(), "Stopping relays");
        for handle in &handles {
            handle.cancel();
        }
        for handle in handles {
            let agent_id = handle.agent_id().to_string();
            if !handle.join(RELAY_JOIN_TIMEOUT).await {
                debug!(agent = %agent_id, "Relay did not stop in time");
            }
        }
    }

    pub fn partition(&self, targets: &[Target], mode: PartitionMode) -> SquadResult<Partition> {
        self.ensure_enabled()?;
        Ok(partition(targets, mode))
    }

    pub async fn list_teams(&self) -> SquadResult<Vec<TeamConfig>> {
        self.ensure_enabled()?;
        self.registry.list().await
    }

    /// Claim the teammate side of a registered member's mailbox
    pub async fn teammate(&self, team: &str, member: &str) -> SquadResult<Teammate> {
        self.ensure_enabled()?;
        let config = self.registry.load(team).await?;
        if config.member(member).is_none() {
            return Err(SquadError::member_not_found(team, member));
        }
        Teammate::open(&self.store, team, member).await
    }

    /// Apply the statuses a snapshot implies. Only forward moves are applied, so a
    /// stale snapshot can never roll a member back.
    async fn refresh(&self, snapshot: &Snapshot) -> SquadResult<TeamConfig> {
        let pending_changes = snapshot.members.iter().any(|m| {
            m.outcome
                .implied_status()
                .is_some_and(|next| next != m.status && m.status.can_advance_to(next))
        });
        if !pending_changes {
            return self.registry.load(&snapshot.team).await;
        }

        self.registry
            .update(&snapshot.team, |config| {
                for observed in &snapshot.members {
                    let Some(next) = observed.outcome.implied_status() else {
                        continue;
                    };
                    if let Some(member) = config.member_mut(&observed.name) {
                        if member.status.can_advance_to(next) && member.advance(next)? {
                            info!(agent = %member.agent_id, status = %next, "Member status updated");
                        }
                    }
                }
                Ok(config.clone())
            })
            .await
    }
}

fn sanitize(key: &str) -> String {
    let cleaned: String = key
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect();
    let trimmed = cleaned.trim_matches('-');
    let mut name: String = trimmed.chars().take(48).collect();
    if name.is_empty() {
        name.push_str("bucket");
    }
    name
}
