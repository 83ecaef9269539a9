//! The teammate-side mailbox writer

use super::jsonl::append_line;
use super::message::Message;
use crate::error::{SquadError, SquadResult};
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{debug, warn};

/// Result of an append
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Appended,
    /// A terminal message was already posted; the message was dropped
    Ignored,
}

/// Claim on a mailbox path, released when the writer is dropped
#[derive(Debug)]
pub(crate) struct WriterRegistration {
    writers: Arc<DashMap<PathBuf, ()>>,
    path: PathBuf,
}

impl WriterRegistration {
    pub(crate) fn claim(writers: Arc<DashMap<PathBuf, ()>>, path: PathBuf) -> Option<Self> {
        use dashmap::mapref::entry::Entry;
        match writers.entry(path.clone()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(());
                Some(Self {
                    writers: Arc::clone(&writers),
                    path,
                })
            }
        }
    }
}

impl Drop for WriterRegistration {
    fn drop(&mut self) {
        self.writers.remove(&self.path);
    }
}

/// The only handle allowed to append to one member's mailbox.
///
/// Not `Clone`: whoever owns it is the single writer.
#[derive(Debug)]
pub struct MailboxWriter {
    agent_id: String,
    path: PathBuf,
    terminal_posted: bool,
    notify: Arc<Notify>,
    _registration: WriterRegistration,
}

impl MailboxWriter {
    pub(crate) fn new(
        agent_id: String,
        path: PathBuf,
        terminal_posted: bool,
        notify: Arc<Notify>,
        registration: WriterRegistration,
    ) -> Self {
        Self {
            agent_id,
            path,
            terminal_posted,
            notify,
            _registration: registration,
        }
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn terminal_posted(&self) -> bool {
        self.terminal_posted
    }

    /// Append a message in order.
    ///
    /// After a terminal message every further append is a protocol violation:
    /// it is logged and ignored so the recorded result cannot be overwritten.
    pub async fn append(&mut self, message: Message) -> SquadResult<AppendOutcome> {
        if message.sender() != self.agent_id {
            return Err(SquadError::invalid_field(
                "from",
                format!(
                    "Message from '{}' cannot be written to the mailbox of '{}'",
                    message.sender(),
                    self.agent_id
                ),
            ));
        }

        if self.terminal_posted {
            warn!(
                agent = %self.agent_id,
                kind = %message.kind(),
                "Ignoring append after terminal message"
            );
            return Ok(AppendOutcome::Ignored);
        }

        append_line(&self.path, &message).await?;
        if message.is_terminal() {
            self.terminal_posted = true;
        }
        self.notify.notify_waiters();

        debug!(agent = %self.agent_id, kind = %message.kind(), "Appended message");
        Ok(AppendOutcome::Appended)
    }
}
