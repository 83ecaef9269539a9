//! Mailbox storage: lead-side reads, teammate-side writer handles, control logs

use super::jsonl::{append_line, read_lines};
use super::message::{ControlMessage, Message};
use super::writer::{MailboxWriter, WriterRegistration};
use crate::error::{SquadError, SquadResult};
use crate::layout::StorageLayout;
use crate::team::types::agent_id;
use dashmap::DashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Notify;
use tracing::debug;

/// Per-member mailboxes and control logs for every team under one root
///
/// Cloning is cheap; clones share the append notifier and the writer registry.
#[derive(Debug, Clone)]
pub struct MailboxStore {
    layout: StorageLayout,
    notify: Arc<Notify>,
    writers: Arc<DashMap<PathBuf, ()>>,
}

impl MailboxStore {
    pub fn new(layout: StorageLayout) -> Self {
        Self {
            layout,
            notify: Arc::new(Notify::new()),
            writers: Arc::new(DashMap::new()),
        }
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    /// Signalled after every in-process append to any mailbox
    pub fn notifier(&self) -> Arc<Notify> {
        Arc::clone(&self.notify)
    }

    /// Create an empty mailbox and control log for a member.
    /// Existing files are left untouched.
    ///
    /// The team's directories must already exist: a team removed by a shutdown is
    /// reported as not found rather than partially recreated.
    pub async fn create(&self, team: &str, member: &str) -> SquadResult<()> {
        for path in [
            self.layout.inbox_path(team, member),
            self.layout.control_path(team, member),
        ] {
            touch(&path).await.map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => SquadError::team_not_found(team),
                _ => SquadError::io_with_path(format!("Failed to create log file: {}", e), &path),
            })?;
        }

        debug!(team, member, "Created mailbox");
        Ok(())
    }

    /// Open the single writer for a member's mailbox.
    ///
    /// Fails while another writer for the same mailbox is alive in this process.
    /// The writer learns whether a terminal message was already posted.
    pub async fn open_writer(&self, team: &str, member: &str) -> SquadResult<MailboxWriter> {
        let path = self.layout.inbox_path(team, member);
        if !path.exists() {
            return Err(SquadError::member_not_found(team, member));
        }

        let registration = WriterRegistration::claim(Arc::clone(&self.writers), path.clone())
            .ok_or_else(|| {
                SquadError::storage(format!(
                    "Mailbox of '{}' in team '{}' already has a writer",
                    member, team
                ))
            })?;

        let existing: Vec<Message> = read_lines(&path).await?;
        let terminal_posted = existing.iter().any(Message::is_terminal);

        Ok(MailboxWriter::new(
            agent_id(member, team),
            path,
            terminal_posted,
            Arc::clone(&self.notify),
            registration,
        ))
    }

    /// Every well-formed message of a member's mailbox, in append order.
    /// Never mutates the mailbox.
    pub async fn read_all(&self, team: &str, member: &str) -> SquadResult<Vec<Message>> {
        read_lines(&self.layout.inbox_path(team, member)).await
    }

    /// Lead-side append to a member's control log
    pub async fn send_control(
        &self,
        team: &str,
        member: &str,
        message: &ControlMessage,
    ) -> SquadResult<()> {
        append_line(&self.layout.control_path(team, member), message).await?;
        self.notify.notify_waiters();
        Ok(())
    }

    /// Teammate-side read of its control log
    pub async fn read_control(&self, team: &str, member: &str) -> SquadResult<Vec<ControlMessage>> {
        read_lines(&self.layout.control_path(team, member)).await
    }
}

async fn touch(path: &std::path::Path) -> std::io::Result<()> {
    fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map(|_| ())
}
