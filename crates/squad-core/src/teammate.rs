//! Teammate side of the mailbox protocol
//!
//! A [`Teammate`] owns the member's mailbox writer and reads the control log the lead
//! writes shutdown requests to. In-process relays and `squad post` both go through it.

use crate::error::SquadResult;
use crate::mailbox::{
    AppendOutcome, CompletionPayload, ControlMessage, FailurePayload, MailboxStore,
    MailboxWriter, Message,
};

#[derive(Debug)]
pub struct Teammate {
    store: MailboxStore,
    team: String,
    member: String,
    writer: MailboxWriter,
}

impl Teammate {
    /// Claim the member's mailbox; fails if it does not exist or already has a writer
    pub async fn open(store: &MailboxStore, team: &str, member: &str) -> SquadResult<Self> {
        let writer = store.open_writer(team, member).await?;
        Ok(Self {
            store: store.clone(),
            team: team.to_string(),
            member: member.to_string(),
            writer,
        })
    }

    pub fn agent_id(&self) -> &str {
        self.writer.agent_id()
    }

    pub fn team(&self) -> &str {
        &self.team
    }

    pub fn member(&self) -> &str {
        &self.member
    }

    pub fn store(&self) -> &MailboxStore {
        &self.store
    }

    /// Whether a terminal message has been posted
    pub fn finished(&self) -> bool {
        self.writer.terminal_posted()
    }

    pub async fn progress(
        &mut self,
        processed_count: u64,
        note: Option<String>,
    ) -> SquadResult<AppendOutcome> {
        let message = Message::progress(self.agent_id(), processed_count, note);
        self.writer.append(message).await
    }

    pub async fn complete(&mut self, payload: CompletionPayload) -> SquadResult<AppendOutcome> {
        let message = Message::completed(self.agent_id(), payload);
        self.writer.append(message).await
    }

    pub async fn fail(&mut self, payload: FailurePayload) -> SquadResult<AppendOutcome> {
        let message = Message::failed(self.agent_id(), payload);
        self.writer.append(message).await
    }

    /// Ignored after a terminal message; the lead counts that message as the ack
    pub async fn acknowledge_shutdown(&mut self, note: Option<String>) -> SquadResult<AppendOutcome> {
        let message = Message::shutdown_ack(self.agent_id(), note);
        self.writer.append(message).await
    }

    /// The first shutdown request on the control log, if any
    pub async fn shutdown_request(&self) -> SquadResult<Option<ControlMessage>> {
        let control = self.store.read_control(&self.team, &self.member).await?;
        Ok(control.into_iter().next())
    }

    pub async fn shutdown_requested(&self) -> SquadResult<bool> {
        Ok(self.shutdown_request().await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::StorageLayout;
    use crate::mailbox::MessageKind;
    use tempfile::TempDir;

    async fn setup(tmp: &TempDir) -> MailboxStore {
        let layout = StorageLayout::new(tmp.path().join("teams"), tmp.path().join("archive"));
        std::fs::create_dir_all(layout.inbox_dir("alpha")).unwrap();
        std::fs::create_dir_all(layout.control_dir("alpha")).unwrap();
        let store = MailboxStore::new(layout);
        store.create("alpha", "unit-1").await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_progress_then_complete() {
        let tmp = TempDir::new().unwrap();
        let store = setup(&tmp).await;
        let mut teammate = Teammate::open(&store, "alpha", "unit-1").await.unwrap();
        assert_eq!(teammate.agent_id(), "unit-1@alpha");

        teammate.progress(1, Some("started".into())).await.unwrap();
        teammate.complete(CompletionPayload::new(3)).await.unwrap();
        assert!(teammate.finished());

        let outcome = teammate.fail(FailurePayload::new("late")).await.unwrap();
        assert_eq!(outcome, AppendOutcome::Ignored);

        let kinds: Vec<MessageKind> = store
            .read_all("alpha", "unit-1")
            .await
            .unwrap()
            .iter()
            .map(Message::kind)
            .collect();
        assert_eq!(kinds, vec![MessageKind::Progress, MessageKind::TaskCompleted]);
    }

    #[tokio::test]
    async fn test_sees_shutdown_request() {
        let tmp = TempDir::new().unwrap();
        let store = setup(&tmp).await;
        let mut teammate = Teammate::open(&store, "alpha", "unit-1").await.unwrap();
        assert!(!teammate.shutdown_requested().await.unwrap());

        store
            .send_control(
                "alpha",
                "unit-1",
                &ControlMessage::shutdown_request("team-lead", None),
            )
            .await
            .unwrap();
        assert!(teammate.shutdown_requested().await.unwrap());

        assert_eq!(
            teammate.acknowledge_shutdown(None).await.unwrap(),
            AppendOutcome::Appended
        );
    }

    #[tokio::test]
    async fn test_second_teammate_on_same_mailbox_rejected() {
        let tmp = TempDir::new().unwrap();
        let store = setup(&tmp).await;
        let _first = Teammate::open(&store, "alpha", "unit-1").await.unwrap();
        assert!(Teammate::open(&store, "alpha", "unit-1").await.is_err());
    }
}
