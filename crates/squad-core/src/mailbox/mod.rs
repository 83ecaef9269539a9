//! Mailbox channel
//!
//! Each member owns one append-only JSONL mailbox. Only the teammate writes it (through
//! its [`MailboxWriter`]); the lead only reads it. A second log per member, the control
//! log, runs the other way and carries shutdown requests from the lead.

mod jsonl;
pub mod message;
pub mod store;
pub mod writer;

pub use message::{
    AckPayload, CompletionPayload, ControlMessage, FailurePayload, Message, MessageKind,
    ProgressPayload, first_terminal,
};
pub use store::MailboxStore;
pub use writer::{AppendOutcome, MailboxWriter};
