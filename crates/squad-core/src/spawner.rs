//! Teammate spawning
//!
//! Spawning registers the member, creates its empty mailbox and submits its assignment.
//! For attached submissions a relay task owns the member's mailbox writer and turns the
//! executor's outcome into the terminal message.

use crate::error::{SquadError, SquadResult};
use crate::executor::{Assignment, Executor, Submission, TaskHandle};
use crate::mailbox::{FailurePayload, MailboxStore, Message};
use crate::partition::Target;
use crate::team::registry::TeamRegistry;
use crate::team::types::{MemberStatus, TeamMember, TeamStatus, validate_name};
use crate::teammate::Teammate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// What to spawn
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpawnRequest {
    pub name: String,
    pub role: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub targets: Vec<Target>,
    #[serde(default)]
    pub reference_paths: Vec<PathBuf>,
}

impl SpawnRequest {
    pub fn new(name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            ..Self::default()
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn with_targets(mut self, targets: Vec<Target>) -> Self {
        self.targets = targets;
        self
    }

    pub fn with_reference_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.reference_paths = paths;
        self
    }
}

/// A spawned member as seen by the lead
#[derive(Debug)]
pub struct MemberHandle {
    pub team: String,
    pub member: TeamMember,
    relay: Option<JoinHandle<()>>,
    stop: CancellationToken,
}

impl MemberHandle {
    pub fn agent_id(&self) -> &str {
        &self.member.agent_id
    }

    /// Whether an in-process relay is tracking the execution
    pub fn is_attached(&self) -> bool {
        self.relay.is_some()
    }

    /// Stop the relay and cancel the attached task; best effort
    pub fn cancel(&self) {
        self.stop.cancel();
    }

    /// Wait for the relay to finish, up to `timeout`
    pub async fn join(self, timeout: Duration) -> bool {
        match self.relay {
            Some(relay) => tokio::time::timeout(timeout, relay).await.is_ok(),
            None => true,
        }
    }
}

/// Registers, creates and submits teammates
#[derive(Clone)]
pub struct Spawner {
    registry: TeamRegistry,
    store: MailboxStore,
    executor: Arc<dyn Executor>,
    poll_interval: Duration,
}

impl Spawner {
    pub fn new(
        registry: TeamRegistry,
        store: MailboxStore,
        executor: Arc<dyn Executor>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            registry,
            store,
            executor,
            poll_interval,
        }
    }

    pub async fn spawn(&self, team: &str, request: SpawnRequest) -> SquadResult<MemberHandle> {
        validate_name("team", team)?;
        validate_name("member", &request.name)?;
        if request.role.trim().is_empty() {
            return Err(SquadError::invalid_field("role", "Role must not be empty"));
        }

        self.registry.ensure_team(team).await?;

        let target_ids = request.targets.iter().map(|t| t.id.clone()).collect();
        let member = TeamMember::new(team, &request.name, &request.role, target_ids);
        let agent_id = member.agent_id.clone();
        self.registry.add_member(team, member).await?;
        self.store.create(team, &request.name).await?;

        let layout = self.store.layout();
        let assignment = Assignment {
            team: team.to_string(),
            member: request.name.clone(),
            agent_id: agent_id.clone(),
            role: request.role.clone(),
            instructions: request.instructions,
            targets: request.targets,
            reference_paths: request.reference_paths,
            mailbox_path: layout.inbox_path(team, &request.name),
            control_path: layout.control_path(team, &request.name),
        };

        let submission = match self.executor.submit(assignment).await {
            Ok(submission) => submission,
            Err(e) => {
                self.record_rejection(team, &request.name, &e).await;
                return Err(e);
            }
        };

        let reference = submission.reference();
        let member = self
            .registry
            .update(team, |config| {
                if config.status == TeamStatus::Forming {
                    config.advance(TeamStatus::Active)?;
                }
                let member = config
                    .member_mut(&request.name)
                    .ok_or_else(|| SquadError::member_not_found(team, &request.name))?;
                member.advance(MemberStatus::Active)?;
                member.submission = Some(reference.clone());
                Ok(member.clone())
            })
            .await?;
        info!(
            team,
            member = %request.name,
            executor = self.executor.name(),
            submission = %reference,
            "Spawned teammate"
        );

        let stop = CancellationToken::new();
        let relay = match submission {
            Submission::Attached(handle) => {
                let teammate = Teammate::open(&self.store, team, &request.name).await?;
                Some(tokio::spawn(relay(
                    teammate,
                    handle,
                    stop.clone(),
                    self.poll_interval,
                )))
            }
            Submission::Detached { .. } => None,
        };

        Ok(MemberHandle {
            team: team.to_string(),
            member,
            relay,
            stop,
        })
    }

    async fn record_rejection(&self, team: &str, name: &str, cause: &SquadError) {
        warn!(team, member = name, "Submission rejected: {}", cause);

        let updated = self
            .registry
            .update(team, |config| match config.member_mut(name) {
                Some(member) => member.advance(MemberStatus::Failed).map(|_| ()),
                None => Err(SquadError::member_not_found(team, name)),
            })
            .await;
        if let Err(e) = updated {
            error!(team, member = name, "Failed to mark rejected member as failed: {}", e);
        }

        if let Err(e) = self.post_rejection(team, name, cause).await {
            error!(team, member = name, "Failed to record rejection in mailbox: {}", e);
        }
    }

    /// The lead writes this one message itself: no relay or worker owns the mailbox yet
    async fn post_rejection(&self, team: &str, name: &str, cause: &SquadError) -> SquadResult<()> {
        let mut writer = self.store.open_writer(team, name).await?;
        let message = Message::failed(
            writer.agent_id().to_string(),
            FailurePayload::new(format!("Submission rejected: {}", cause)),
        );
        writer.append(message).await?;
        Ok(())
    }
}

/// Relays an attached execution into the member's mailbox.
///
/// Ends after posting the terminal message, after acknowledging a shutdown request
/// (the task is cancelled first), or when `stop` fires.
async fn relay(
    mut teammate: Teammate,
    handle: Box<dyn TaskHandle>,
    stop: CancellationToken,
    interval: Duration,
) {
    let cancel = handle.cancel_token();
    let task_id = handle.id().to_string();
    let mut outcome = handle.result();
    let notify = teammate.store().notifier();

    loop {
        let notified = notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        match teammate.shutdown_requested().await {
            Ok(true) => {
                cancel.cancel();
                if let Err(e) = teammate
                    .acknowledge_shutdown(Some("cancelled before completion".to_string()))
                    .await
                {
                    warn!(agent = %teammate.agent_id(), "Failed to acknowledge shutdown: {}", e);
                }
                debug!(agent = %teammate.agent_id(), task = %task_id, "Relay stopped by shutdown request");
                return;
            }
            Ok(false) => {}
            Err(e) => warn!(agent = %teammate.agent_id(), "Failed to read control log: {}", e),
        }

        tokio::select! {
            result = &mut outcome => {
                let posted = match result {
                    Ok(payload) => teammate.complete(payload).await,
                    Err(failure) => teammate.fail(failure).await,
                };
                match posted {
                    Ok(_) => debug!(agent = %teammate.agent_id(), task = %task_id, "Relayed result"),
                    Err(e) => error!(agent = %teammate.agent_id(), "Failed to relay result: {}", e),
                }
                return;
            }
            _ = stop.cancelled() => {
                cancel.cancel();
                debug!(agent = %teammate.agent_id(), task = %task_id, "Relay cancelled");
                return;
            }
            _ = &mut notified => {}
            _ = tokio::time::sleep(interval) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::InProcessExecutor;
    use crate::layout::StorageLayout;
    use crate::mailbox::{CompletionPayload, ControlMessage, MessageKind};
    use async_trait::async_trait;
    use mockall::mock;
    use tempfile::TempDir;

    mock! {
        pub Executor {}

        #[async_trait]
        impl Executor for Executor {
            fn name(&self) -> &str;
            async fn submit(&self, assignment: Assignment) -> SquadResult<Submission>;
        }
    }

    fn parts(tmp: &TempDir) -> (TeamRegistry, MailboxStore) {
        let layout = StorageLayout::new(tmp.path().join("teams"), tmp.path().join("archive"));
        (TeamRegistry::new(layout.clone()), MailboxStore::new(layout))
    }

    fn spawner(tmp: &TempDir, executor: Arc<dyn Executor>) -> (Spawner, TeamRegistry, MailboxStore) {
        let (registry, store) = parts(tmp);
        let spawner = Spawner::new(
            registry.clone(),
            store.clone(),
            executor,
            Duration::from_millis(10),
        );
        (spawner, registry, store)
    }

    fn echo_executor() -> Arc<dyn Executor> {
        Arc::new(InProcessExecutor::new(|assignment: Assignment, _cancel| async move {
            Ok(CompletionPayload::new(assignment.targets.len() as u64))
        }))
    }

    #[tokio::test]
    async fn test_spawn_registers_and_relays() {
        let tmp = TempDir::new().unwrap();
        let (spawner, registry, store) = spawner(&tmp, echo_executor());

        let handle = spawner
            .spawn(
                "alpha",
                SpawnRequest::new("unit-1", "unit-tester")
                    .with_targets(vec![Target::new("a", ""), Target::new("b", "")]),
            )
            .await
            .unwrap();
        assert!(handle.is_attached());
        assert_eq!(handle.member.status, MemberStatus::Active);
        assert!(handle.join(Duration::from_secs(5)).await);

        let config = registry.load("alpha").await.unwrap();
        assert_eq!(config.status, TeamStatus::Active);
        assert_eq!(config.members[0].targets, vec!["a", "b"]);
        assert!(config.members[0].submission.as_deref().unwrap().starts_with("task:"));

        let messages = store.read_all("alpha", "unit-1").await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].kind(), MessageKind::TaskCompleted);
    }

    #[tokio::test]
    async fn test_duplicate_spawn_rejected() {
        let tmp = TempDir::new().unwrap();
        let (spawner, registry, _) = spawner(&tmp, echo_executor());

        spawner
            .spawn("alpha", SpawnRequest::new("unit-1", "unit-tester"))
            .await
            .unwrap();
        let err = spawner
            .spawn("alpha", SpawnRequest::new("unit-1", "property-tester"))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "SQUAD_DUPLICATE_MEMBER");

        let config = registry.load("alpha").await.unwrap();
        assert_eq!(config.members.len(), 1);
        assert_eq!(config.members[0].role, "unit-tester");
    }

    #[tokio::test]
    async fn test_invalid_names_rejected_before_storage() {
        let tmp = TempDir::new().unwrap();
        let (spawner, registry, _) = spawner(&tmp, echo_executor());

        let err = spawner
            .spawn("bad team", SpawnRequest::new("unit-1", "unit-tester"))
            .await
            .unwrap_err();
        assert!(err.is_usage());
        let err = spawner
            .spawn("alpha", SpawnRequest::new("../escape", "unit-tester"))
            .await
            .unwrap_err();
        assert!(err.is_usage());
        assert!(registry.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_submission_marks_member_failed() {
        let tmp = TempDir::new().unwrap();
        let mut executor = MockExecutor::new();
        executor.expect_name().return_const("mock".to_string());
        executor
            .expect_submit()
            .times(1)
            .returning(|_| Err(SquadError::executor("no capacity")));
        let (spawner, registry, store) = spawner(&tmp, Arc::new(executor));

        let err = spawner
            .spawn("alpha", SpawnRequest::new("unit-1", "unit-tester"))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "SQUAD_EXECUTOR");

        let config = registry.load("alpha").await.unwrap();
        assert_eq!(config.status, TeamStatus::Forming);
        assert_eq!(config.members[0].status, MemberStatus::Failed);

        let messages = store.read_all("alpha", "unit-1").await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].kind(), MessageKind::TaskFailed);
    }

    #[tokio::test]
    async fn test_detached_submission_has_no_relay() {
        let tmp = TempDir::new().unwrap();
        let mut executor = MockExecutor::new();
        executor.expect_name().return_const("mock".to_string());
        executor.expect_submit().returning(|assignment| {
            Ok(Submission::Detached {
                reference: format!("external:{}", assignment.member),
            })
        });
        let (spawner, registry, store) = spawner(&tmp, Arc::new(executor));

        let handle = spawner
            .spawn("alpha", SpawnRequest::new("unit-1", "unit-tester"))
            .await
            .unwrap();
        assert!(!handle.is_attached());

        let config = registry.load("alpha").await.unwrap();
        assert_eq!(
            config.members[0].submission.as_deref(),
            Some("external:unit-1")
        );
        // the external worker can claim the mailbox
        assert!(Teammate::open(&store, "alpha", "unit-1").await.is_ok());
    }

    #[tokio::test]
    async fn test_relay_acknowledges_shutdown_request() {
        let tmp = TempDir::new().unwrap();
        let executor: Arc<dyn Executor> =
            Arc::new(InProcessExecutor::new(|_assignment: Assignment, _cancel| async move {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(CompletionPayload::new(1))
            }));
        let (spawner, _, store) = spawner(&tmp, executor);

        let handle = spawner
            .spawn("alpha", SpawnRequest::new("slow", "unit-tester"))
            .await
            .unwrap();
        store
            .send_control(
                "alpha",
                "slow",
                &ControlMessage::shutdown_request("team-lead", None),
            )
            .await
            .unwrap();
        assert!(handle.join(Duration::from_secs(5)).await);

        let messages = store.read_all("alpha", "slow").await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].kind(), MessageKind::ShutdownAck);
    }

    #[tokio::test]
    async fn test_cancelled_relay_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let executor: Arc<dyn Executor> =
            Arc::new(InProcessExecutor::new(|_assignment: Assignment, _cancel| async move {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(CompletionPayload::new(1))
            }));
        let (spawner, _, store) = spawner(&tmp, executor);

        let handle = spawner
            .spawn("alpha", SpawnRequest::new("slow", "unit-tester"))
            .await
            .unwrap();
        handle.cancel();
        assert!(handle.join(Duration::from_secs(5)).await);
        assert!(store.read_all("alpha", "slow").await.unwrap().is_empty());
    }
}
