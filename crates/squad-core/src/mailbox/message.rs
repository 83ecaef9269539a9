//! Mailbox and control-log message schema
//!
//! Mailbox lines look like:
//!
//! ```json
//! {"type":"task_completed","from":"unit-1@alpha","timestamp":"2026-03-01T12:00:00Z",
//!  "payload":{"processed_count":5,"artifacts":["tests/auth.rs"],"metrics":{"mocks":3}}}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Payload of a successful run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionPayload {
    /// Number of targets the teammate reports as processed
    pub processed_count: u64,
    /// Produced artifacts (file paths or identifiers)
    #[serde(default)]
    pub artifacts: Vec<String>,
    /// Technique-specific sub-metrics, passed through untouched
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metrics: BTreeMap<String, serde_json::Value>,
    /// Non-fatal problems the teammate ran into
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl CompletionPayload {
    pub fn new(processed_count: u64) -> Self {
        Self {
            processed_count,
            ..Self::default()
        }
    }

    pub fn with_artifacts(mut self, artifacts: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.artifacts.extend(artifacts.into_iter().map(Into::into));
        self
    }

    pub fn with_metric(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metrics.insert(key.into(), value.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.errors.push(error.into());
        self
    }
}

/// Payload of a failed run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FailurePayload {
    /// Error description
    pub message: String,
    /// Artifacts produced before the failure
    #[serde(default)]
    pub partial_artifacts: Vec<String>,
}

impl FailurePayload {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            partial_artifacts: Vec::new(),
        }
    }

    pub fn with_partial_artifacts(
        mut self,
        artifacts: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.partial_artifacts
            .extend(artifacts.into_iter().map(Into::into));
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AckPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Intermediate progress; never terminal
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressPayload {
    pub processed_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// A message in a teammate's mailbox
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    TaskCompleted {
        from: String,
        timestamp: DateTime<Utc>,
        payload: CompletionPayload,
    },
    #[serde(alias = "error")]
    TaskFailed {
        from: String,
        timestamp: DateTime<Utc>,
        payload: FailurePayload,
    },
    ShutdownAck {
        from: String,
        timestamp: DateTime<Utc>,
        #[serde(default)]
        payload: AckPayload,
    },
    Progress {
        from: String,
        timestamp: DateTime<Utc>,
        payload: ProgressPayload,
    },
}

/// Discriminant of [`Message`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    TaskCompleted,
    TaskFailed,
    ShutdownAck,
    Progress,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::TaskCompleted => "task_completed",
            Self::TaskFailed => "task_failed",
            Self::ShutdownAck => "shutdown_ack",
            Self::Progress => "progress",
        };
        f.write_str(s)
    }
}

impl Message {
    pub fn completed(from: impl Into<String>, payload: CompletionPayload) -> Self {
        Self::TaskCompleted {
            from: from.into(),
            timestamp: Utc::now(),
            payload,
        }
    }

    pub fn failed(from: impl Into<String>, payload: FailurePayload) -> Self {
        Self::TaskFailed {
            from: from.into(),
            timestamp: Utc::now(),
            payload,
        }
    }

    pub fn shutdown_ack(from: impl Into<String>, note: Option<String>) -> Self {
        Self::ShutdownAck {
            from: from.into(),
            timestamp: Utc::now(),
            payload: AckPayload { note },
        }
    }

    pub fn progress(from: impl Into<String>, processed_count: u64, note: Option<String>) -> Self {
        Self::Progress {
            from: from.into(),
            timestamp: Utc::now(),
            payload: ProgressPayload {
                processed_count,
                note,
            },
        }
    }

    pub fn sender(&self) -> &str {
        match self {
            Self::TaskCompleted { from, .. }
            | Self::TaskFailed { from, .. }
            | Self::ShutdownAck { from, .. }
            | Self::Progress { from, .. } => from,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::TaskCompleted { timestamp, .. }
            | Self::TaskFailed { timestamp, .. }
            | Self::ShutdownAck { timestamp, .. }
            | Self::Progress { timestamp, .. } => *timestamp,
        }
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            Self::TaskCompleted { .. } => MessageKind::TaskCompleted,
            Self::TaskFailed { .. } => MessageKind::TaskFailed,
            Self::ShutdownAck { .. } => MessageKind::ShutdownAck,
            Self::Progress { .. } => MessageKind::Progress,
        }
    }

    /// `task_completed` and `task_failed` end a teammate's run
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::TaskCompleted { .. } | Self::TaskFailed { .. }
        )
    }
}

/// The first terminal message of a mailbox; later ones are never considered.
pub fn first_terminal(messages: &[Message]) -> Option<&Message> {
    messages.iter().find(|m| m.is_terminal())
}

/// A message in a teammate's control log, written by the lead
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    ShutdownRequest {
        from: String,
        timestamp: DateTime<Utc>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

impl ControlMessage {
    pub fn shutdown_request(from: impl Into<String>, reason: Option<String>) -> Self {
        Self::ShutdownRequest {
            from: from.into(),
            timestamp: Utc::now(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format() {
        let msg = Message::completed(
            "unit-1@alpha",
            CompletionPayload::new(5)
                .with_artifacts(["tests/a.rs"])
                .with_metric("mocks", 3),
        );
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "task_completed");
        assert_eq!(value["from"], "unit-1@alpha");
        assert_eq!(value["payload"]["processed_count"], 5);
        assert_eq!(value["payload"]["artifacts"][0], "tests/a.rs");
        assert_eq!(value["payload"]["metrics"]["mocks"], 3);
        assert!(value["payload"].get("errors").is_none());
    }

    #[test]
    fn test_error_alias_reads_as_task_failed() {
        let line = r#"{"type":"error","from":"b@t","timestamp":"2026-03-01T12:00:00Z","payload":{"message":"boom"}}"#;
        let msg: Message = serde_json::from_str(line).unwrap();
        assert_eq!(msg.kind(), MessageKind::TaskFailed);
        assert!(msg.is_terminal());
        match msg {
            Message::TaskFailed { payload, .. } => {
                assert_eq!(payload.message, "boom");
                assert!(payload.partial_artifacts.is_empty());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_shutdown_ack_without_payload() {
        let line = r#"{"type":"shutdown_ack","from":"c@t","timestamp":"2026-03-01T12:00:00Z"}"#;
        let msg: Message = serde_json::from_str(line).unwrap();
        assert_eq!(msg.kind(), MessageKind::ShutdownAck);
        assert!(!msg.is_terminal());
    }

    #[test]
    fn test_first_terminal_ignores_later_ones() {
        let messages = vec![
            Message::progress("a@t", 1, None),
            Message::failed("a@t", FailurePayload::new("first")),
            Message::completed("a@t", CompletionPayload::new(9)),
        ];
        let terminal = first_terminal(&messages).unwrap();
        assert_eq!(terminal.kind(), MessageKind::TaskFailed);
    }

    #[test]
    fn test_control_message_format() {
        let msg = ControlMessage::shutdown_request("team-lead", None);
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "shutdown_request");
        assert!(value.get("reason").is_none());
    }
}
